//! Sources of transaction history.
//!
//! A source exposes one capability to the scanner: fetch the page of
//! transactions touching an address that precede a cursor signature. Two
//! provider styles back it: raw JSON-RPC (signature listing plus one
//! detail request per signature) and enriched history (parsed records
//! returned directly).

pub mod helius;
pub mod rpc;

use async_trait::async_trait;

use crate::common::error::Result;
use crate::types::TransactionPage;

pub use helius::HeliusSource;
pub use rpc::RpcSource;

/// Page-fetch capability consumed by the scanner.
///
/// `Ok` with an empty page means the history is exhausted; transport and
/// provider failures are reported as `Err` so callers can tell the two
/// apart.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Fetches the page of transactions for `address` strictly older than
    /// `before` (or the newest page when `before` is `None`).
    ///
    /// # Errors
    ///
    /// Returns an error on transport or provider failure.
    async fn fetch_page(&self, address: &str, before: Option<&str>) -> Result<TransactionPage>;

    /// Short name used in progress output.
    fn source_name(&self) -> &'static str;
}

#[async_trait]
impl<S: TransactionSource + ?Sized> TransactionSource for std::sync::Arc<S> {
    async fn fetch_page(&self, address: &str, before: Option<&str>) -> Result<TransactionPage> {
        (**self).fetch_page(address, before).await
    }

    fn source_name(&self) -> &'static str {
        (**self).source_name()
    }
}
