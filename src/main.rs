//! Command-line front end for the trade scanner.
//!
//! Provider settings come from the environment (a `.env` file is loaded
//! first) and can be overridden with flags. Each pipeline stage writes its
//! result into the snapshot directory for the next stage to read.

#![warn(clippy::all, clippy::pedantic)]

use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use solana_trade_scanner::common::logging::{self, LogLevel};
use solana_trade_scanner::storage::{
    FOCUS_TRADES_FILE, SURROUNDING_TRADES_FILE, TOKEN_ACCOUNTS_FILE, TOKEN_BUYS_FILE,
    TOKEN_BUYS_WITH_SURROUNDING_FILE,
};
use solana_trade_scanner::{
    AcceptAll, BuyDetector, CommitmentLevel, FocusTrade, HeliusSource, Result, RpcSource,
    ScanWindow, ScannerConfig, ScannerConfigBuilder, SnapshotStore, SurroundingReport, TokenBuy,
    TradeScannerError, WindowScanner, attach_surrounding_trades, common_wallets,
    fetch_transaction, find_focus_trades, find_surrounding_trades, find_token_buys,
    report_wallets, token_creation_date,
};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "solana-trade-scanner")]
#[command(about = "Scan Solana wallet history for trades around a focus buy", version)]
struct Cli {
    #[command(flatten)]
    provider: ProviderArgs,

    /// Directory holding the JSON snapshot files
    #[arg(long, env = "SNAPSHOT_DIR", default_value = ".", global = true)]
    snapshot_dir: String,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ProviderArgs {
    /// Raw JSON-RPC endpoint (overrides RPC_URL)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Signatures or records requested per page
    #[arg(long, global = true)]
    page_size: Option<usize>,

    /// Concurrent transaction detail requests
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Stop each scan after this many pages
    #[arg(long, global = true)]
    max_pages: Option<usize>,

    /// processed, confirmed or finalized
    #[arg(long, global = true)]
    commitment: Option<CommitmentLevel>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Log keyword for the buy heuristic (repeatable)
    #[arg(long = "keyword", global = true)]
    keywords: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect buys of a token in a wallet's recent history
    Focus {
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        mint: String,
        /// Only consider transactions from the last N seconds
        #[arg(long, value_parser = non_negative)]
        since_secs: Option<i64>,
    },
    /// Detect buys of a token through the enriched-history provider
    TokenBuys {
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        mint: String,
        /// Only consider transactions from the last N seconds
        #[arg(long, value_parser = non_negative)]
        since_secs: Option<i64>,
    },
    /// Collect transactions around each saved focus trade
    Surrounding {
        /// Address whose history is scanned
        #[arg(long)]
        address: String,
        /// Half-width of the window around each focus trade
        #[arg(long, default_value_t = 600, value_parser = non_negative)]
        width_secs: i64,
    },
    /// Attach the trades preceding each saved token buy on a pair address
    BuysSurrounding {
        #[arg(long)]
        pair: String,
        /// Width of the window before each buy
        #[arg(long, default_value_t = 1000, value_parser = non_negative)]
        width_ms: i64,
    },
    /// Report the block time of a token's earliest transaction
    CreationDate {
        #[arg(long)]
        mint: String,
    },
    /// List a wallet's SPL token accounts
    TokenAccounts {
        #[arg(long)]
        owner: String,
    },
    /// Fetch and print one transaction
    Tx { signature: String },
    /// List fee payers present in two surrounding-trade snapshots
    CommonWallets { first: String, second: String },
}

impl ProviderArgs {
    fn apply(&self, mut builder: ScannerConfigBuilder) -> ScannerConfigBuilder {
        if let Some(url) = &self.rpc_url {
            builder = builder.with_rpc(url.clone());
        }
        if let Some(page_size) = self.page_size {
            builder = builder.with_page_size(page_size);
        }
        if let Some(concurrency) = self.concurrency {
            builder = builder.with_concurrency(concurrency);
        }
        if let Some(max_pages) = self.max_pages {
            builder = builder.with_max_pages(max_pages);
        }
        if let Some(commitment) = self.commitment {
            builder = builder.with_commitment(commitment);
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.with_request_timeout(Duration::from_secs(secs));
        }
        if !self.keywords.is_empty() {
            builder = builder.with_keywords(self.keywords.clone());
        }
        builder
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    let config = match ScannerConfigBuilder::from_env()
        .map(|builder| cli.provider.apply(builder))
        .and_then(ScannerConfigBuilder::build)
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logging::log(LogLevel::Warning, "Interrupted; finishing the current page.");
            on_signal.cancel();
        }
    });

    let store = SnapshotStore::new(&cli.snapshot_dir);
    let result = run(cli.command, &config, &store, cancel).await;
    if let Err(e) = &result {
        match e {
            TradeScannerError::SnapshotMissing(reason) => {
                logging::log(LogLevel::Warning, &format!("{reason}; nothing to do."));
            }
            TradeScannerError::ConfigError(_) => eprintln!("{e}"),
            _ => logging::log(LogLevel::Error, &e.to_string()),
        }
    }

    if result.as_ref().is_err_and(is_fatal) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// A missing input snapshot means an earlier stage found nothing; every
/// other error fails the run.
fn is_fatal(err: &TradeScannerError) -> bool {
    !matches!(err, TradeScannerError::SnapshotMissing(_))
}

fn non_negative(value: &str) -> std::result::Result<i64, String> {
    match value.parse::<i64>() {
        Ok(n) if n >= 0 => Ok(n),
        Ok(_) => Err("must not be negative".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn since(secs: Option<i64>) -> ScanWindow {
    match secs {
        Some(secs) => {
            ScanWindow::before(chrono::Utc::now().timestamp_millis(), secs.saturating_mul(1000))
        }
        None => ScanWindow::unbounded(),
    }
}

fn rpc_scanner(config: &ScannerConfig, cancel: CancellationToken) -> Result<WindowScanner<RpcSource>> {
    Ok(WindowScanner::new(RpcSource::new(config)?)
        .with_max_pages(config.max_pages)
        .with_cancellation(cancel))
}

fn helius_scanner(
    config: &ScannerConfig,
    cancel: CancellationToken,
) -> Result<WindowScanner<HeliusSource>> {
    Ok(WindowScanner::new(HeliusSource::new(config)?)
        .with_max_pages(config.max_pages)
        .with_cancellation(cancel))
}

async fn run(
    command: Command,
    config: &ScannerConfig,
    store: &SnapshotStore,
    cancel: CancellationToken,
) -> Result<()> {
    match command {
        Command::Focus {
            wallet,
            mint,
            since_secs,
        } => {
            // Without a window only the most recent page is examined.
            let scanner = rpc_scanner(config, cancel)?
                .with_max_pages(config.max_pages.or(since_secs.is_none().then_some(1)));
            let detector = BuyDetector::new(wallet, mint, &config.keywords);

            let trades = find_focus_trades(&scanner, &detector, since(since_secs)).await;
            store.save(FOCUS_TRADES_FILE, &trades).await?;
        }
        Command::TokenBuys {
            wallet,
            mint,
            since_secs,
        } => {
            let scanner = helius_scanner(config, cancel)?;
            let buys = find_token_buys(&scanner, &wallet, &mint, since(since_secs)).await;
            store.save(TOKEN_BUYS_FILE, &buys).await?;
        }
        Command::Surrounding {
            address,
            width_secs,
        } => {
            let focus_trades: Vec<FocusTrade> = store.load(FOCUS_TRADES_FILE).await?;
            if focus_trades.is_empty() {
                logging::log(LogLevel::Warning, "No focus trades found. Exiting.");
                return Ok(());
            }

            let scanner = rpc_scanner(config, cancel)?;
            let mut reports: Vec<SurroundingReport> = Vec::with_capacity(focus_trades.len());
            for focus in &focus_trades {
                reports.push(
                    find_surrounding_trades(&scanner, &address, focus, width_secs, &AcceptAll)
                        .await,
                );
            }
            store.save(SURROUNDING_TRADES_FILE, &reports).await?;
        }
        Command::BuysSurrounding { pair, width_ms } => {
            let mut buys: Vec<TokenBuy> = store.load(TOKEN_BUYS_FILE).await?;
            let scanner = helius_scanner(config, cancel)?;

            attach_surrounding_trades(&scanner, &pair, &mut buys, width_ms).await;
            store.save(TOKEN_BUYS_WITH_SURROUNDING_FILE, &buys).await?;
        }
        Command::CreationDate { mint } => {
            let rpc = RpcSource::new(config)?;
            let created =
                token_creation_date(&rpc, &mint, config.page_size, config.max_pages, &cancel)
                    .await?;
            if let Some(date) = created {
                println!("{}", date.to_rfc3339());
            }
        }
        Command::TokenAccounts { owner } => {
            let rpc = RpcSource::new(config)?;
            let accounts = tokio::select! {
                accounts = rpc.token_accounts(&owner) => accounts?,
                () = cancel.cancelled() => return Ok(()),
            };

            logging::log(
                LogLevel::Info,
                &format!("{} token account(s) owned by {owner}", accounts.len()),
            );
            for account in &accounts {
                println!("{} {} {}", account.address, account.mint, account.amount);
            }
            store.save(TOKEN_ACCOUNTS_FILE, &accounts).await?;
        }
        Command::Tx { signature } => {
            let rpc = RpcSource::new(config)?;
            let record = tokio::select! {
                record = fetch_transaction(&rpc, &signature) => record?,
                () = cancel.cancelled() => return Ok(()),
            };
            if let Some(record) = record {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        }
        Command::CommonWallets { first, second } => {
            let first: Vec<SurroundingReport> = store.load(&first).await?;
            let second: Vec<SurroundingReport> = store.load(&second).await?;

            let wallets = common_wallets(report_wallets(&first), report_wallets(&second));
            logging::log(
                LogLevel::Info,
                &format!("{} wallet(s) trading in both sets", wallets.len()),
            );
            for wallet in wallets {
                println!("{wallet}");
            }
        }
    }

    Ok(())
}
