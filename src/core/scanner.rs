//! Windowed transaction scanner.
//!
//! Walks an address's history backward one page at a time, keeping the
//! records that fall inside a [`ScanWindow`] and satisfy a
//! [`TransactionFilter`]. A scan ends on the first of:
//!
//! * an empty page (history exhausted),
//! * a record older than the window (pages arrive newest first, so nothing
//!   later can be newer),
//! * a cursor that did not move between pages,
//! * the optional page cap or cancellation,
//! * a page-fetch failure, which keeps the partial results.
//!
//! The scan itself never returns an error; the reason it stopped is part of
//! the [`ScanOutcome`].

use std::collections::HashSet;
use std::fmt;

use tokio_util::sync::CancellationToken;

use super::filters::TransactionFilter;
use crate::common::logging::{self, LogLevel};
use crate::sources::TransactionSource;
use crate::types::{ScanWindow, TransactionRecord};

/// Why a scan stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The source returned an empty page.
    Exhausted,
    /// A record older than the window was reached.
    Boundary,
    /// The cursor did not advance.
    NoProgress,
    /// The configured page cap was reached.
    PageLimit,
    /// The cancellation token fired.
    Cancelled,
    /// A page fetch failed; results are partial.
    FetchFailed(String),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exhausted => write!(f, "history exhausted"),
            Termination::Boundary => write!(f, "window boundary reached"),
            Termination::NoProgress => write!(f, "cursor did not advance"),
            Termination::PageLimit => write!(f, "page limit reached"),
            Termination::Cancelled => write!(f, "cancelled"),
            Termination::FetchFailed(reason) => write!(f, "page fetch failed: {reason}"),
        }
    }
}

/// Result of one scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Matching records in fetch order.
    pub records: Vec<TransactionRecord>,
    pub termination: Termination,
    /// Number of page requests issued, including a failed one.
    pub pages_fetched: usize,
}

/// Paginating scanner over a [`TransactionSource`].
///
/// Each call to [`scan`](Self::scan) owns its cursor, seen-set and result
/// buffer; nothing is shared between scans.
pub struct WindowScanner<S> {
    source: S,
    max_pages: Option<usize>,
    cancel: Option<CancellationToken>,
}

impl<S: TransactionSource> WindowScanner<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_pages: None,
            cancel: None,
        }
    }

    /// Caps the number of page requests per scan.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Stops scans once `token` is cancelled. Checked before every page.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Scans `address` backward from `start_cursor` (exclusive), or from the
    /// newest transaction when no cursor is given.
    pub async fn scan(
        &self,
        address: &str,
        window: ScanWindow,
        start_cursor: Option<&str>,
        filter: &dyn TransactionFilter,
    ) -> ScanOutcome {
        let mut cursor = start_cursor.map(str::to_string);
        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();
        let mut pages_fetched = 0;

        let termination = loop {
            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                break Termination::Cancelled;
            }
            if self.max_pages.is_some_and(|max| pages_fetched >= max) {
                break Termination::PageLimit;
            }

            logging::log(
                LogLevel::Debug,
                &format!(
                    "Fetching {} page for {address} before {}",
                    self.source.source_name(),
                    cursor.as_deref().unwrap_or("<latest>")
                ),
            );

            let page = match self.source.fetch_page(address, cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    pages_fetched += 1;
                    logging::log(
                        LogLevel::Error,
                        &format!("Error fetching transactions for {address}: {e}"),
                    );
                    break Termination::FetchFailed(e.to_string());
                }
            };
            pages_fetched += 1;

            if page.is_empty() {
                break Termination::Exhausted;
            }

            let next_cursor = page
                .cursor
                .clone()
                .or_else(|| page.records.last().map(|record| record.signature.clone()));

            let mut hit_boundary = false;
            for record in page.records {
                if !seen.insert(record.signature.clone()) {
                    log::debug!("duplicate signature skipped: {}", record.signature);
                    continue;
                }

                let Some(timestamp_ms) = record.timestamp_ms() else {
                    log::debug!("no block time, skipped: {}", record.signature);
                    continue;
                };

                if window.is_older(timestamp_ms) {
                    log::debug!(
                        "{} at {timestamp_ms} is before window start {}",
                        record.signature,
                        window.start_ms
                    );
                    hit_boundary = true;
                    break;
                }

                if window.contains(timestamp_ms) && filter.matches(&record) {
                    records.push(record);
                }
            }

            if hit_boundary {
                break Termination::Boundary;
            }

            match next_cursor {
                None => break Termination::Exhausted,
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    logging::log(
                        LogLevel::Warning,
                        &format!("Duplicate batch detected at {next}; ending pagination."),
                    );
                    break Termination::NoProgress;
                }
                Some(next) => cursor = Some(next),
            }
        };

        logging::log(
            LogLevel::Info,
            &format!(
                "Scan of {address}: {} matching in {pages_fetched} page(s), {termination}",
                records.len()
            ),
        );

        ScanOutcome {
            records,
            termination,
            pages_fetched,
        }
    }
}
