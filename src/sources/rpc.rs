//! Raw JSON-RPC source.
//!
//! Pages are built in two steps: `getSignaturesForAddress` lists up to
//! `page_size` signatures older than the cursor, then `getTransaction` is
//! issued for each of them with at most `concurrency` requests in flight.
//! Detail results keep the listing order.

use std::str::FromStr;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_client::rpc_request::RpcRequest;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiMessage,
    UiTransactionEncoding, UiTransactionTokenBalance,
};

use super::TransactionSource;
use crate::common::error::{Result, TradeScannerError};
use crate::common::logging::{self, LogLevel};
use crate::config::ScannerConfig;
use crate::types::{
    SignatureInfo, TokenAccount, TokenBalance, TransactionPage, TransactionRecord,
};

/// The SPL Token program; token accounts are listed by this owner program.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
struct KeyedAccount {
    pubkey: String,
    account: ParsedAccount,
}

#[derive(Deserialize)]
struct ParsedAccount {
    data: Value,
}

/// JSON-RPC backed transaction source.
pub struct RpcSource {
    client: RpcClient,
    commitment: CommitmentConfig,
    page_size: usize,
    concurrency: usize,
}

impl RpcSource {
    /// Creates a source from the RPC settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TradeScannerError::ConfigError`] if no RPC endpoint is set.
    pub fn new(config: &ScannerConfig) -> Result<Self> {
        let commitment = config.commitment.to_commitment_config();
        let client = RpcClient::new_with_timeout_and_commitment(
            config.rpc_url()?.to_string(),
            config.request_timeout,
            commitment,
        );

        Ok(Self {
            client,
            commitment,
            page_size: config.page_size,
            concurrency: config.concurrency,
        })
    }

    /// Lists signatures touching `address`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if `address` or `before` is malformed or the request
    /// fails.
    pub async fn signatures(
        &self,
        address: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>> {
        let pubkey = parse_address(address)?;
        let before = before.map(parse_signature).transpose()?;

        let config = GetConfirmedSignaturesForAddress2Config {
            before,
            limit: Some(limit),
            commitment: Some(self.commitment),
            ..Default::default()
        };

        let statuses = self
            .client
            .get_signatures_for_address_with_config(&pubkey, config)
            .await?;

        Ok(statuses
            .into_iter()
            .map(|status| SignatureInfo {
                signature: status.signature,
                block_time: status.block_time,
            })
            .collect())
    }

    /// Fetches one transaction. A `null` result (unknown or pruned
    /// transaction) yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if `signature` is malformed, the request fails or
    /// the response cannot be decoded.
    pub async fn transaction(&self, signature: &str) -> Result<Option<TransactionRecord>> {
        let parsed = parse_signature(signature)?;
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };

        let response: Option<EncodedConfirmedTransactionWithStatusMeta> = self
            .client
            .send(
                RpcRequest::GetTransaction,
                json!([parsed.to_string(), config]),
            )
            .await?;

        response.map(decode_transaction).transpose()
    }

    /// Lists the SPL token accounts owned by `owner`.
    ///
    /// Entries whose parsed data lacks a mint or amount are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `owner` is malformed or the request fails.
    pub async fn token_accounts(&self, owner: &str) -> Result<Vec<TokenAccount>> {
        let pubkey = parse_address(owner)?;

        let response: WithContext<Vec<KeyedAccount>> = self
            .client
            .send(
                RpcRequest::GetTokenAccountsByOwner,
                json!([
                    pubkey.to_string(),
                    { "programId": TOKEN_PROGRAM_ID },
                    { "encoding": "jsonParsed", "commitment": self.commitment.commitment }
                ]),
            )
            .await?;

        Ok(response
            .value
            .into_iter()
            .filter_map(|keyed| {
                let account = token_account(&keyed);
                if account.is_none() {
                    logging::log(
                        LogLevel::Warning,
                        &format!("Skipping unparsed token account {}", keyed.pubkey),
                    );
                }
                account
            })
            .collect())
    }

    async fn transaction_or_skip(&self, info: &SignatureInfo) -> Option<TransactionRecord> {
        match self.transaction(&info.signature).await {
            Ok(Some(mut record)) => {
                if record.block_time.is_none() {
                    record.block_time = info.block_time;
                }
                Some(record)
            }
            Ok(None) => {
                logging::log(
                    LogLevel::Warning,
                    &format!("Transaction not found or pruned: {}", info.signature),
                );
                None
            }
            Err(e) => {
                logging::log(
                    LogLevel::Warning,
                    &format!("Failed to fetch transaction {}: {e}", info.signature),
                );
                None
            }
        }
    }
}

#[async_trait]
impl TransactionSource for RpcSource {
    async fn fetch_page(&self, address: &str, before: Option<&str>) -> Result<TransactionPage> {
        let infos = self.signatures(address, before, self.page_size).await?;
        let Some(last) = infos.last() else {
            return Ok(TransactionPage::empty());
        };
        let cursor = Some(last.signature.clone());

        let fetches: Vec<_> = infos
            .iter()
            .map(|info| self.transaction_or_skip(info))
            .collect();
        let records: Vec<TransactionRecord> = stream::iter(fetches)
            .buffered(self.concurrency)
            .filter_map(|record| async move { record })
            .collect()
            .await;

        log::debug!(
            "rpc page for {address}: {} listed, {} fetched",
            infos.len(),
            records.len()
        );

        Ok(TransactionPage { records, cursor })
    }

    fn source_name(&self) -> &'static str {
        "JSON-RPC"
    }
}

pub(crate) fn parse_address(address: &str) -> Result<Pubkey> {
    Pubkey::from_str(address).map_err(|_| TradeScannerError::InvalidAddress(address.to_string()))
}

pub(crate) fn parse_signature(signature: &str) -> Result<Signature> {
    Signature::from_str(signature)
        .map_err(|_| TradeScannerError::InvalidSignature(signature.to_string()))
}

fn token_account(keyed: &KeyedAccount) -> Option<TokenAccount> {
    let info = keyed.account.data.pointer("/parsed/info")?;
    let amount = info.pointer("/tokenAmount/amount")?.as_str()?;
    let decimals = info.pointer("/tokenAmount/decimals")?.as_u64()?;

    Some(TokenAccount {
        address: keyed.pubkey.clone(),
        mint: info.get("mint")?.as_str()?.to_string(),
        amount: amount.to_string(),
        decimals: u8::try_from(decimals).ok()?,
    })
}

/// Converts a JSON-encoded RPC transaction into a [`TransactionRecord`].
///
/// Account keys include addresses loaded from lookup tables (writable, then
/// readonly) so that balance indices line up.
///
/// # Errors
///
/// Returns [`TradeScannerError::DecodingError`] if the transaction is not
/// JSON encoded or carries no signature.
pub fn decode_transaction(tx: EncodedConfirmedTransactionWithStatusMeta) -> Result<TransactionRecord> {
    let EncodedTransaction::Json(ui_transaction) = tx.transaction.transaction else {
        return Err(TradeScannerError::DecodingError(
            "transaction is not JSON encoded".to_string(),
        ));
    };

    let signature = ui_transaction.signatures.first().cloned().ok_or_else(|| {
        TradeScannerError::DecodingError("transaction has no signatures".to_string())
    })?;

    let mut account_keys = match ui_transaction.message {
        UiMessage::Raw(raw) => raw.account_keys,
        UiMessage::Parsed(parsed) => parsed
            .account_keys
            .into_iter()
            .map(|account| account.pubkey)
            .collect(),
    };

    let mut record = TransactionRecord::new(signature, tx.block_time);

    if let Some(meta) = tx.transaction.meta {
        if let OptionSerializer::Some(loaded) = meta.loaded_addresses {
            account_keys.extend(loaded.writable);
            account_keys.extend(loaded.readonly);
        }
        record.pre_balances = meta.pre_balances;
        record.post_balances = meta.post_balances;
        record.log_messages = option_vec(meta.log_messages);
        record.pre_token_balances = option_vec(meta.pre_token_balances)
            .into_iter()
            .map(token_balance)
            .collect();
        record.post_token_balances = option_vec(meta.post_token_balances)
            .into_iter()
            .map(token_balance)
            .collect();
    }

    record.account_keys = account_keys;
    Ok(record)
}

fn option_vec<T>(value: OptionSerializer<Vec<T>>) -> Vec<T> {
    match value {
        OptionSerializer::Some(items) => items,
        OptionSerializer::None | OptionSerializer::Skip => Vec::new(),
    }
}

fn token_balance(balance: UiTransactionTokenBalance) -> TokenBalance {
    TokenBalance {
        account_index: balance.account_index,
        mint: balance.mint,
        owner: match balance.owner {
            OptionSerializer::Some(owner) => Some(owner),
            OptionSerializer::None | OptionSerializer::Skip => None,
        },
        amount: balance.ui_token_amount.amount,
        decimals: balance.ui_token_amount.decimals,
    }
}
