//! Error types for the trade scanner.

use thiserror::Error;

/// Errors produced by configuration, providers and the snapshot store.
///
/// The scanner itself never surfaces these to its caller; a failed page
/// fetch ends the scan and is reported through
/// [`Termination::FetchFailed`](crate::core::scanner::Termination).
#[derive(Debug, Error)]
pub enum TradeScannerError {
    /// Missing or invalid configuration (for example an absent API key).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON-RPC transport or provider failure.
    #[error("RPC error: {0}")]
    RpcError(String),

    /// HTTP failure talking to the enriched-history provider.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// A provider response could not be turned into a transaction record.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// An input snapshot does not exist yet.
    #[error("Snapshot missing: {0}")]
    SnapshotMissing(String),

    /// A snapshot exists but does not decode.
    #[error("Snapshot error: {0}")]
    SnapshotError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<solana_client::client_error::ClientError> for TradeScannerError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        Self::RpcError(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TradeScannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = TradeScannerError::ConfigError("HELIUS_API_KEY is not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: HELIUS_API_KEY is not set"
        );

        let err = TradeScannerError::InvalidSignature("abc".to_string());
        assert_eq!(err.to_string(), "Invalid signature: abc");

        let err = TradeScannerError::SnapshotMissing("focus_trades.json not found".to_string());
        assert_eq!(err.to_string(), "Snapshot missing: focus_trades.json not found");
    }

    #[test]
    fn test_serde_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: TradeScannerError = parse.unwrap_err().into();
        assert!(matches!(err, TradeScannerError::SerializationError(_)));
    }
}
