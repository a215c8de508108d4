//! Relevance predicates applied by the scanner.

use super::buy::{BuyDetector, is_valid_buy};
use crate::types::TransactionRecord;

/// Decides whether a transaction inside the scan window is kept.
///
/// Any `Fn(&TransactionRecord) -> bool` closure is a filter.
pub trait TransactionFilter: Send + Sync {
    fn matches(&self, tx: &TransactionRecord) -> bool;
}

impl<F> TransactionFilter for F
where
    F: Fn(&TransactionRecord) -> bool + Send + Sync,
{
    fn matches(&self, tx: &TransactionRecord) -> bool {
        self(tx)
    }
}

/// Keeps every transaction in the window.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl TransactionFilter for AcceptAll {
    fn matches(&self, _tx: &TransactionRecord) -> bool {
        true
    }
}

/// Keeps transactions that reference an address (a mint or pair account)
/// among their account keys.
#[derive(Debug, Clone)]
pub struct AccountMembership {
    address: String,
}

impl AccountMembership {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl TransactionFilter for AccountMembership {
    fn matches(&self, tx: &TransactionRecord) -> bool {
        tx.references(&self.address)
    }
}

/// Keeps transactions with a parsed token transfer of the given mint.
#[derive(Debug, Clone)]
pub struct TokenTransferMembership {
    mint: String,
}

impl TokenTransferMembership {
    #[must_use]
    pub fn new(mint: impl Into<String>) -> Self {
        Self { mint: mint.into() }
    }
}

impl TransactionFilter for TokenTransferMembership {
    fn matches(&self, tx: &TransactionRecord) -> bool {
        tx.token_transfers
            .iter()
            .any(|transfer| transfer.mint == self.mint)
    }
}

impl TransactionFilter for BuyDetector {
    fn matches(&self, tx: &TransactionRecord) -> bool {
        self.is_buy(tx)
    }
}

/// Keeps enriched transactions where `wallet` sent SOL and received `mint`.
#[derive(Debug, Clone)]
pub struct EnrichedBuy {
    wallet: String,
    mint: String,
}

impl EnrichedBuy {
    #[must_use]
    pub fn new(wallet: impl Into<String>, mint: impl Into<String>) -> Self {
        Self {
            wallet: wallet.into(),
            mint: mint.into(),
        }
    }
}

impl TransactionFilter for EnrichedBuy {
    fn matches(&self, tx: &TransactionRecord) -> bool {
        is_valid_buy(tx, &self.wallet, &self.mint).is_valid()
    }
}
