//! Provider-neutral transaction records.

use serde::{Deserialize, Serialize};

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// A single on-chain transaction as returned by a provider.
///
/// Raw JSON-RPC providers fill the balance and log fields; enriched-history
/// providers fill the parsed transfer lists. Fields a provider does not
/// supply are left empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub signature: String,
    /// Unix timestamp in seconds; absent for unconfirmed or pruned transactions.
    pub block_time: Option<i64>,
    /// Index 0 is the fee payer.
    #[serde(default)]
    pub account_keys: Vec<String>,
    /// Native balances in lamports, indexed like `account_keys`.
    #[serde(default)]
    pub pre_balances: Vec<u64>,
    #[serde(default)]
    pub post_balances: Vec<u64>,
    #[serde(default)]
    pub pre_token_balances: Vec<TokenBalance>,
    #[serde(default)]
    pub post_token_balances: Vec<TokenBalance>,
    #[serde(default)]
    pub log_messages: Vec<String>,
    #[serde(default)]
    pub token_transfers: Vec<TokenTransfer>,
    #[serde(default)]
    pub native_transfers: Vec<NativeTransfer>,
}

impl TransactionRecord {
    /// Creates a record with only a signature and block time.
    #[must_use]
    pub fn new(signature: impl Into<String>, block_time: Option<i64>) -> Self {
        Self {
            signature: signature.into(),
            block_time,
            ..Default::default()
        }
    }

    /// Block time in milliseconds.
    #[must_use]
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.block_time.map(|secs| secs.saturating_mul(1000))
    }

    /// Returns true if `address` is among the referenced accounts.
    #[must_use]
    pub fn references(&self, address: &str) -> bool {
        self.account_keys.iter().any(|key| key == address)
    }

    /// Position of `address` in the account key list.
    #[must_use]
    pub fn account_index(&self, address: &str) -> Option<usize> {
        self.account_keys.iter().position(|key| key == address)
    }

    /// Raw token amount held by `owner` for `mint` before the transaction.
    /// Missing balances count as zero.
    #[must_use]
    pub fn pre_token_amount(&self, owner: &str, mint: &str) -> u128 {
        find_token_amount(&self.pre_token_balances, owner, mint)
    }

    /// Raw token amount held by `owner` for `mint` after the transaction.
    #[must_use]
    pub fn post_token_amount(&self, owner: &str, mint: &str) -> u128 {
        find_token_amount(&self.post_token_balances, owner, mint)
    }
}

fn find_token_amount(balances: &[TokenBalance], owner: &str, mint: &str) -> u128 {
    balances
        .iter()
        .find(|balance| balance.owner.as_deref() == Some(owner) && balance.mint == mint)
        .map_or(0, TokenBalance::raw_amount)
}

/// A token account balance snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: String,
    pub owner: Option<String>,
    /// Raw amount in the token's smallest unit, as the RPC reports it.
    pub amount: String,
    pub decimals: u8,
}

impl TokenBalance {
    /// Parsed raw amount; unparseable values count as zero.
    #[must_use]
    pub fn raw_amount(&self) -> u128 {
        self.amount.parse().unwrap_or(0)
    }
}

/// A parsed token transfer from an enriched-history provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Amount in whole tokens.
    pub amount: f64,
    pub mint: String,
}

/// A parsed native currency transfer from an enriched-history provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeTransfer {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Amount in lamports.
    pub amount: u64,
}

/// An SPL token account held by a wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccount {
    /// The token account's own address.
    pub address: String,
    pub mint: String,
    /// Raw amount in the token's smallest unit.
    pub amount: String,
    pub decimals: u8,
}

impl TokenAccount {
    /// Parsed raw amount; unparseable values count as zero.
    #[must_use]
    pub fn raw_amount(&self) -> u128 {
        self.amount.parse().unwrap_or(0)
    }
}

/// One entry of a signature listing (`getSignaturesForAddress`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    pub block_time: Option<i64>,
}

/// One page of history returned by a source.
///
/// `cursor` is the signature of the last entry the provider listed, which
/// may differ from the last record when a detail fetch failed. A page with
/// no records and no cursor means the history is exhausted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPage {
    pub records: Vec<TransactionRecord>,
    pub cursor: Option<String>,
}

impl TransactionPage {
    /// Builds a page whose cursor is the last record's signature.
    #[must_use]
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        let cursor = records.last().map(|record| record.signature.clone());
        Self { records, cursor }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.cursor.is_none()
    }
}
