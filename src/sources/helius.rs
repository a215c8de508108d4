//! Enriched-history source.
//!
//! Uses the `/v0/addresses/{address}/transactions` endpoint, which returns
//! parsed transfer events directly and needs no per-signature round-trip.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::TransactionSource;
use crate::common::error::{Result, TradeScannerError};
use crate::common::logging::{self, LogLevel};
use crate::config::ScannerConfig;
use crate::types::{NativeTransfer, TokenTransfer, TransactionPage, TransactionRecord};

/// Largest page the endpoint accepts.
const MAX_ENRICHED_PAGE: usize = 100;

/// Enriched-history backed transaction source.
pub struct HeliusSource {
    http: Client,
    base_url: String,
    api_key: String,
    page_size: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrichedTransaction {
    signature: String,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    fee_payer: Option<String>,
    #[serde(default, alias = "solTransfers")]
    native_transfers: Option<Vec<EnrichedNativeTransfer>>,
    #[serde(default)]
    token_transfers: Option<Vec<EnrichedTokenTransfer>>,
    #[serde(default)]
    account_data: Option<Vec<EnrichedAccountData>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrichedNativeTransfer {
    #[serde(default, alias = "from")]
    from_user_account: Option<String>,
    #[serde(default, alias = "to")]
    to_user_account: Option<String>,
    #[serde(default)]
    amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrichedTokenTransfer {
    #[serde(default, alias = "from")]
    from_user_account: Option<String>,
    #[serde(default, alias = "to")]
    to_user_account: Option<String>,
    #[serde(default, alias = "amount")]
    token_amount: f64,
    #[serde(default)]
    mint: String,
}

#[derive(Debug, Deserialize)]
struct EnrichedAccountData {
    account: String,
}

impl From<EnrichedTransaction> for TransactionRecord {
    fn from(tx: EnrichedTransaction) -> Self {
        let mut account_keys: Vec<String> = Vec::new();
        let accounts = tx
            .fee_payer
            .into_iter()
            .chain(tx.account_data.unwrap_or_default().into_iter().map(|data| data.account));
        for account in accounts {
            if !account_keys.contains(&account) {
                account_keys.push(account);
            }
        }

        TransactionRecord {
            signature: tx.signature,
            block_time: tx.timestamp,
            account_keys,
            native_transfers: tx
                .native_transfers
                .unwrap_or_default()
                .into_iter()
                .map(|t| NativeTransfer {
                    from: t.from_user_account,
                    to: t.to_user_account,
                    amount: t.amount,
                })
                .collect(),
            token_transfers: tx
                .token_transfers
                .unwrap_or_default()
                .into_iter()
                .map(|t| TokenTransfer {
                    from: t.from_user_account,
                    to: t.to_user_account,
                    amount: t.token_amount,
                    mint: t.mint,
                })
                .collect(),
            ..Default::default()
        }
    }
}

impl HeliusSource {
    /// Creates a source from the enriched-history settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TradeScannerError::ConfigError`] without an API key, or an
    /// HTTP error if the client cannot be built.
    pub fn new(config: &ScannerConfig) -> Result<Self> {
        let helius = config.helius()?;
        let http = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            http,
            base_url: helius.base_url.clone(),
            api_key: helius.api_key.clone(),
            page_size: config.page_size.min(MAX_ENRICHED_PAGE),
        })
    }

    fn endpoint(&self, address: &str) -> String {
        format!("{}/v0/addresses/{address}/transactions", self.base_url)
    }
}

#[async_trait]
impl TransactionSource for HeliusSource {
    async fn fetch_page(&self, address: &str, before: Option<&str>) -> Result<TransactionPage> {
        let limit = self.page_size.to_string();
        let mut query: Vec<(&str, &str)> =
            vec![("api-key", self.api_key.as_str()), ("limit", limit.as_str())];
        if let Some(before) = before {
            query.push(("before", before));
        }

        let response = self
            .http
            .get(self.endpoint(address))
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TradeScannerError::RpcError(format!(
                "enriched history request failed with {status}: {body}"
            )));
        }

        let raw: Vec<serde_json::Value> = response.json().await?;
        logging::log(
            LogLevel::Debug,
            &format!("Fetched {} enriched transactions.", raw.len()),
        );

        Ok(decode_page(raw))
    }

    fn source_name(&self) -> &'static str {
        "Helius"
    }
}

/// Decodes a raw page, skipping malformed entries. The cursor tracks the
/// last listed signature even when that entry is skipped.
fn decode_page(raw: Vec<serde_json::Value>) -> TransactionPage {
    let cursor = raw
        .iter()
        .rev()
        .find_map(|value| value.get("signature").and_then(|s| s.as_str()))
        .map(str::to_string);

    let records = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<EnrichedTransaction>(value) {
            Ok(tx) => Some(TransactionRecord::from(tx)),
            Err(e) => {
                logging::log(
                    LogLevel::Warning,
                    &format!("Skipping malformed enriched transaction: {e}"),
                );
                None
            }
        })
        .collect();

    TransactionPage { records, cursor }
}
