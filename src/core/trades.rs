//! Trade pipeline operations.
//!
//! Focus-trade detection produces the input of surrounding-trade detection;
//! the two are normally run as separate invocations with a snapshot file in
//! between.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::buy::{BuyDetector, is_valid_buy};
use super::filters::{AcceptAll, EnrichedBuy, TokenTransferMembership, TransactionFilter};
use super::scanner::WindowScanner;
use crate::common::error::Result;
use crate::common::logging::{self, LogLevel};
use crate::sources::{RpcSource, TransactionSource};
use crate::types::{
    EnrichedSurroundingTrade, FocusTrade, ScanWindow, SurroundingReport, SurroundingTrade,
    TokenBuy, TransactionRecord,
};

/// Token pair label used in focus-trade records.
#[must_use]
pub fn token_pair_label(mint: &str) -> String {
    format!("{mint}/SOL")
}

/// Finds heuristic buys of the detector's mint in the detector's wallet
/// history within `window`.
pub async fn find_focus_trades<S: TransactionSource>(
    scanner: &WindowScanner<S>,
    detector: &BuyDetector,
    window: ScanWindow,
) -> Vec<FocusTrade> {
    logging::log(
        LogLevel::Info,
        &format!(
            "Fetching trades for wallet {} (token {})",
            detector.wallet(),
            detector.mint()
        ),
    );

    let outcome = scanner.scan(detector.wallet(), window, None, detector).await;

    let trades: Vec<FocusTrade> = outcome
        .records
        .iter()
        .filter_map(|record| {
            Some(FocusTrade {
                signature: record.signature.clone(),
                wallet: detector.wallet().to_string(),
                timestamp: record.block_time?,
                token_pair: token_pair_label(detector.mint()),
                sol_spent: detector.evaluate(record).sol_spent(),
            })
        })
        .collect();

    logging::log(
        LogLevel::Success,
        &format!("Found {} focus trade(s)", trades.len()),
    );
    trades
}

/// Finds buys of `mint` by `wallet` through an enriched-history source.
///
/// Only the wallet's receipts of the mint and its outgoing SOL transfers
/// are kept on each record, so `token_transfers[0].to` is the buyer.
pub async fn find_token_buys<S: TransactionSource>(
    scanner: &WindowScanner<S>,
    wallet: &str,
    mint: &str,
    window: ScanWindow,
) -> Vec<TokenBuy> {
    let names_mint = TokenTransferMembership::new(mint);
    let valid_buy = EnrichedBuy::new(wallet, mint);
    let filter = |record: &TransactionRecord| names_mint.matches(record) && valid_buy.matches(record);

    let outcome = scanner.scan(wallet, window, None, &filter).await;

    let buys: Vec<TokenBuy> = outcome
        .records
        .into_iter()
        .filter_map(|record| {
            let date = DateTime::<Utc>::from_timestamp(record.block_time?, 0)?;
            Some(TokenBuy {
                date,
                mint: mint.to_string(),
                token_transfers: record
                    .token_transfers
                    .into_iter()
                    .filter(|t| t.mint == mint && t.to.as_deref() == Some(wallet))
                    .collect(),
                sol_transfers: record
                    .native_transfers
                    .into_iter()
                    .filter(|t| t.from.as_deref() == Some(wallet))
                    .collect(),
                signature: record.signature,
                surrounding_trades: None,
            })
        })
        .collect();

    logging::log(
        LogLevel::Success,
        &format!("Found {} token buy(s) of {mint} by {wallet}", buys.len()),
    );
    buys
}

/// Collects transactions on `address` within `width_secs` of a focus trade,
/// scanning backward from the focus signature.
pub async fn find_surrounding_trades<S: TransactionSource>(
    scanner: &WindowScanner<S>,
    address: &str,
    focus: &FocusTrade,
    width_secs: i64,
    filter: &dyn TransactionFilter,
) -> SurroundingReport {
    logging::log(
        LogLevel::Info,
        &format!(
            "Fetching surrounding trades for timestamp {}, tokenPair {}",
            focus.timestamp, focus.token_pair
        ),
    );

    let window = ScanWindow::around_secs(focus.timestamp, width_secs);
    let outcome = scanner
        .scan(address, window, Some(focus.signature.as_str()), filter)
        .await;

    let surrounding_trades: Vec<SurroundingTrade> = outcome
        .records
        .into_iter()
        .filter_map(|record| {
            Some(SurroundingTrade {
                timestamp: record.block_time?,
                signature: record.signature,
                token_pair: focus.token_pair.clone(),
                accounts: record.account_keys,
            })
        })
        .collect();

    logging::log(
        LogLevel::Success,
        &format!("Found {} surrounding trade(s).", surrounding_trades.len()),
    );

    SurroundingReport {
        focus_trade: focus.clone(),
        surrounding_trades,
    }
}

/// Scans `pair_address` backward from each buy over `width_ms` and attaches
/// every transaction seen, flagged with the enriched buy check for the
/// buy's wallet and mint.
pub async fn attach_surrounding_trades<S: TransactionSource>(
    scanner: &WindowScanner<S>,
    pair_address: &str,
    buys: &mut [TokenBuy],
    width_ms: i64,
) {
    logging::log(
        LogLevel::Info,
        &format!("Processing {} focus transactions...", buys.len()),
    );

    for buy in buys.iter_mut() {
        let focus_ms = buy.date.timestamp_millis();
        let wallet = buy.buyer().map(str::to_string);

        logging::log_section(&format!("Focus TxID: {}", buy.signature));
        logging::log(
            LogLevel::Info,
            &format!("Focus Timestamp: {}", buy.date.to_rfc3339()),
        );

        let window = ScanWindow::before(focus_ms, width_ms);
        let outcome = scanner
            .scan(pair_address, window, Some(buy.signature.as_str()), &AcceptAll)
            .await;

        let trades: Vec<EnrichedSurroundingTrade> = outcome
            .records
            .into_iter()
            .filter_map(|record| {
                let timestamp = record.timestamp_ms()?;
                let check = wallet
                    .as_deref()
                    .map(|wallet| is_valid_buy(&record, wallet, &buy.mint));
                let valid_buy = check.is_some_and(|check| check.is_valid());

                let mut line = format!("TxID: {} | TS: {timestamp}", record.signature);
                match check.and_then(|check| check.reason()) {
                    None if valid_buy => line.push_str(" | Buy: yes"),
                    Some(reason) => line.push_str(&format!(" | Buy: no | Reason: {reason}")),
                    None => line.push_str(" | Buy: no | Reason: unknown buyer"),
                }
                logging::log(LogLevel::Debug, &line);

                Some(EnrichedSurroundingTrade {
                    signature: record.signature.clone(),
                    timestamp,
                    details: record,
                    valid_buy,
                })
            })
            .collect();

        let valid = trades.iter().filter(|t| t.valid_buy).count();
        logging::log(
            LogLevel::Success,
            &format!(
                "Summary for {}: {} surrounding, {valid} valid buy(s), {} invalid",
                buy.signature,
                trades.len(),
                trades.len() - valid
            ),
        );

        buy.surrounding_trades = Some(trades);
    }
}

/// Finds the earliest block time in `mint`'s signature history.
///
/// Walks signature pages to the oldest entry. When `max_pages` or `cancel`
/// stops the walk early the oldest entry seen so far is used. If the listing
/// has no block time for that entry the transaction is fetched.
///
/// # Errors
///
/// Returns an error if `mint` is not a valid address or a signature or
/// transaction request fails.
pub async fn token_creation_date(
    rpc: &RpcSource,
    mint: &str,
    page_size: usize,
    max_pages: Option<usize>,
    cancel: &CancellationToken,
) -> Result<Option<DateTime<Utc>>> {
    logging::log(
        LogLevel::Info,
        &format!("Fetching transactions for token mint: {mint}"),
    );

    let mut before: Option<String> = None;
    let mut oldest = None;
    let mut pages = 0;

    loop {
        if cancel.is_cancelled() {
            logging::log(
                LogLevel::Warning,
                "Cancelled; reporting the oldest signature seen so far.",
            );
            break;
        }
        if max_pages.is_some_and(|max| pages >= max) {
            logging::log(
                LogLevel::Warning,
                "Page limit reached; reporting the oldest signature seen so far.",
            );
            break;
        }

        let page = rpc.signatures(mint, before.as_deref(), page_size).await?;
        pages += 1;

        let Some(last) = page.last().cloned() else {
            break;
        };
        if before.as_deref() == Some(last.signature.as_str()) {
            break;
        }
        before = Some(last.signature.clone());
        oldest = Some(last);
    }

    let Some(earliest) = oldest else {
        logging::log(LogLevel::Warning, "No transactions found for this token mint.");
        return Ok(None);
    };
    logging::log(
        LogLevel::Info,
        &format!("Found earliest signature: {}", earliest.signature),
    );

    let block_time = match earliest.block_time {
        Some(time) => Some(time),
        None => rpc
            .transaction(&earliest.signature)
            .await?
            .and_then(|record| record.block_time),
    };

    let created = block_time.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    match created {
        Some(date) => logging::log(
            LogLevel::Success,
            &format!("Token creation date: {}", date.to_rfc3339()),
        ),
        None => logging::log(
            LogLevel::Warning,
            "No block time found; the endpoint may have pruned this history.",
        ),
    }
    Ok(created)
}

/// Looks up a single transaction for inspection.
///
/// # Errors
///
/// Returns an error if `signature` is malformed or the request fails.
pub async fn fetch_transaction(rpc: &RpcSource, signature: &str) -> Result<Option<TransactionRecord>> {
    let record = rpc.transaction(signature).await?;
    if record.is_none() {
        logging::log(
            LogLevel::Warning,
            &format!("Transaction not found or pruned: {signature}"),
        );
    }
    Ok(record)
}

/// Wallets present in both lists, in first-seen order of `first`.
pub fn common_wallets<'a, A, B>(first: A, second: B) -> Vec<String>
where
    A: IntoIterator<Item = &'a str>,
    B: IntoIterator<Item = &'a str>,
{
    let second: HashSet<&str> = second.into_iter().collect();
    let mut emitted: HashSet<&str> = HashSet::new();

    first
        .into_iter()
        .filter(|wallet| second.contains(wallet) && emitted.insert(wallet))
        .map(str::to_string)
        .collect()
}

/// Fee payers of every surrounding trade in `reports`.
pub fn report_wallets(reports: &[SurroundingReport]) -> impl Iterator<Item = &str> {
    reports
        .iter()
        .flat_map(|report| report.surrounding_trades.iter())
        .filter_map(SurroundingTrade::wallet)
}
