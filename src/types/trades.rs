//! Records persisted between pipeline runs.
//!
//! Field names follow the JSON snapshot files (`focus_trades.json`,
//! `surrounding_trades.json`, `token_buys.json`,
//! `token_buys_with_surrounding.json`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{NativeTransfer, TokenTransfer, TransactionRecord};

/// A buy of the focus token by the focus wallet, found by the buy heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusTrade {
    pub signature: String,
    pub wallet: String,
    /// Block time in seconds.
    pub timestamp: i64,
    pub token_pair: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sol_spent: Option<f64>,
}

/// A transaction observed near a focus trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurroundingTrade {
    pub signature: String,
    /// Block time in seconds.
    pub timestamp: i64,
    pub token_pair: String,
    pub accounts: Vec<String>,
}

impl SurroundingTrade {
    /// The fee payer of the transaction.
    #[must_use]
    pub fn wallet(&self) -> Option<&str> {
        self.accounts.first().map(String::as_str)
    }
}

/// A focus trade together with the trades around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurroundingReport {
    pub focus_trade: FocusTrade,
    pub surrounding_trades: Vec<SurroundingTrade>,
}

/// A token buy found through an enriched-history provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBuy {
    pub signature: String,
    pub date: DateTime<Utc>,
    pub mint: String,
    #[serde(default)]
    pub token_transfers: Vec<TokenTransfer>,
    #[serde(default)]
    pub sol_transfers: Vec<NativeTransfer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surrounding_trades: Option<Vec<EnrichedSurroundingTrade>>,
}

impl TokenBuy {
    /// The receiving wallet of the first token transfer.
    #[must_use]
    pub fn buyer(&self) -> Option<&str> {
        self.token_transfers
            .first()
            .and_then(|transfer| transfer.to.as_deref())
    }
}

/// A transaction observed near a token buy, with the buy check applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedSurroundingTrade {
    pub signature: String,
    /// Block time in milliseconds.
    pub timestamp: i64,
    pub details: TransactionRecord,
    pub valid_buy: bool,
}
