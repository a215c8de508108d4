//! Buy detection.
//!
//! Two checks live here:
//!
//! * [`BuyDetector`] works on raw RPC records. A transaction counts as a buy
//!   of `mint` by `wallet` when a log line contains one of the keywords
//!   (case-insensitive), the wallet's token balance strictly increased and
//!   its native balance strictly decreased. This is approximate: swaps
//!   through programs that log none of the keywords are missed, and
//!   unrelated logs mentioning a keyword can let a transfer through.
//! * [`is_valid_buy`] works on enriched records: the wallet sent a positive
//!   SOL amount and received a positive amount of the mint.

use crate::types::TransactionRecord;
use crate::types::record::LAMPORTS_PER_SOL;

/// Intermediate values of the buy heuristic for one transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyEvaluation {
    pub logs_match: bool,
    pub pre_token: u128,
    pub post_token: u128,
    pub pre_native: u64,
    pub post_native: u64,
}

impl BuyEvaluation {
    #[must_use]
    pub fn token_increased(&self) -> bool {
        self.post_token > self.pre_token
    }

    #[must_use]
    pub fn native_decreased(&self) -> bool {
        self.post_native < self.pre_native
    }

    #[must_use]
    pub fn is_buy(&self) -> bool {
        self.logs_match && self.token_increased() && self.native_decreased()
    }

    /// SOL spent, only for transactions judged to be buys.
    #[must_use]
    pub fn sol_spent(&self) -> Option<f64> {
        self.is_buy()
            .then(|| (self.pre_native - self.post_native) as f64 / LAMPORTS_PER_SOL)
    }
}

/// Heuristic detector for buys of one mint by one wallet.
#[derive(Debug, Clone)]
pub struct BuyDetector {
    wallet: String,
    mint: String,
    keywords: Vec<String>,
}

impl BuyDetector {
    /// `keywords` are matched case-insensitively.
    #[must_use]
    pub fn new<I, S>(wallet: impl Into<String>, mint: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            wallet: wallet.into(),
            mint: mint.into(),
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    #[must_use]
    pub fn mint(&self) -> &str {
        &self.mint
    }

    /// Computes every input of the heuristic.
    ///
    /// The wallet's native balance is read at its position in the account
    /// keys, falling back to index 0 (the fee payer) when the wallet is not
    /// listed. Missing balances count as zero.
    #[must_use]
    pub fn evaluate(&self, tx: &TransactionRecord) -> BuyEvaluation {
        let index = tx.account_index(&self.wallet).unwrap_or(0);

        let evaluation = BuyEvaluation {
            logs_match: logs_contain_keywords(&tx.log_messages, &self.keywords),
            pre_token: tx.pre_token_amount(&self.wallet, &self.mint),
            post_token: tx.post_token_amount(&self.wallet, &self.mint),
            pre_native: tx.pre_balances.get(index).copied().unwrap_or(0),
            post_native: tx.post_balances.get(index).copied().unwrap_or(0),
        };

        log::debug!(
            "buy check {}: keywords={} token {}->{} native {}->{} buy={}",
            tx.signature,
            evaluation.logs_match,
            evaluation.pre_token,
            evaluation.post_token,
            evaluation.pre_native,
            evaluation.post_native,
            evaluation.is_buy()
        );

        evaluation
    }

    #[must_use]
    pub fn is_buy(&self, tx: &TransactionRecord) -> bool {
        self.evaluate(tx).is_buy()
    }
}

/// True when any log line contains any keyword, ignoring case.
/// `keywords` must already be lower-case.
#[must_use]
pub fn logs_contain_keywords(logs: &[String], keywords: &[String]) -> bool {
    logs.iter().any(|line| {
        let line = line.to_lowercase();
        keywords.iter().any(|keyword| line.contains(keyword.as_str()))
    })
}

/// Outcome of the enriched buy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyCheck {
    Valid,
    MissingSolTransfer,
    MissingTokenTransfer,
}

impl BuyCheck {
    #[must_use]
    pub fn is_valid(self) -> bool {
        self == BuyCheck::Valid
    }

    /// Human-readable reason for a rejected buy.
    #[must_use]
    pub fn reason(self) -> Option<&'static str> {
        match self {
            BuyCheck::Valid => None,
            BuyCheck::MissingSolTransfer => Some("Missing SOL transfer"),
            BuyCheck::MissingTokenTransfer => Some("Missing token transfer"),
        }
    }
}

/// Checks an enriched record for a SOL payment by `wallet` and a receipt of
/// `mint` by `wallet`.
#[must_use]
pub fn is_valid_buy(tx: &TransactionRecord, wallet: &str, mint: &str) -> BuyCheck {
    let sol_sent = tx.native_transfers.iter().any(|transfer| {
        transfer.from.as_deref() == Some(wallet) && transfer.to.is_some() && transfer.amount > 0
    });
    if !sol_sent {
        return BuyCheck::MissingSolTransfer;
    }

    let token_received = tx.token_transfers.iter().any(|transfer| {
        transfer.to.as_deref() == Some(wallet) && transfer.mint == mint && transfer.amount > 0.0
    });
    if !token_received {
        return BuyCheck::MissingTokenTransfer;
    }

    BuyCheck::Valid
}
