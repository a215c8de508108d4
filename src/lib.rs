//! Windowed wallet history scanner for Solana.
//!
//! The crate walks an address's transaction history backward, page by page,
//! keeping the transactions that fall inside a time window and pass a
//! relevance filter. On top of the scanner sit the trade pipeline
//! operations: heuristic focus-trade detection for a wallet and mint, the
//! trades surrounding a focus trade, enriched token-buy detection, a token's
//! creation date and wallet overlap between two reports.
//!
//! ```no_run
//! use solana_trade_scanner::{
//!     BuyDetector, RpcSource, ScanWindow, ScannerConfigBuilder, WindowScanner,
//!     find_focus_trades,
//! };
//!
//! # async fn run() -> solana_trade_scanner::Result<()> {
//! let config = ScannerConfigBuilder::new()
//!     .with_rpc("https://api.mainnet-beta.solana.com")
//!     .with_max_pages(1)
//!     .build()?;
//!
//! let scanner = WindowScanner::new(RpcSource::new(&config)?).with_max_pages(config.max_pages);
//! let detector = BuyDetector::new("<wallet>", "<mint>", &config.keywords);
//! let trades = find_focus_trades(&scanner, &detector, ScanWindow::unbounded()).await;
//! println!("{} focus trades", trades.len());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]

pub mod common;
pub mod config;
pub mod core;
pub mod sources;
pub mod storage;
pub mod types;

pub use common::error::{Result, TradeScannerError};
pub use config::{CommitmentLevel, HeliusConfig, ScannerConfig, ScannerConfigBuilder};
pub use crate::core::{
    AcceptAll, AccountMembership, BuyCheck, BuyDetector, BuyEvaluation, EnrichedBuy,
    ScanOutcome, Termination, TokenTransferMembership, TransactionFilter, WindowScanner,
    attach_surrounding_trades, common_wallets, fetch_transaction, find_focus_trades,
    find_surrounding_trades, find_token_buys, is_valid_buy, report_wallets,
    token_creation_date, token_pair_label,
};
pub use sources::{HeliusSource, RpcSource, TransactionSource};
pub use storage::SnapshotStore;
pub use types::{
    EnrichedSurroundingTrade, FocusTrade, NativeTransfer, ScanWindow, SignatureInfo,
    SurroundingReport, SurroundingTrade, TokenAccount, TokenBalance, TokenBuy, TokenTransfer,
    TransactionPage, TransactionRecord,
};
