//! Scanner configuration.
//!
//! Configuration is an explicit value handed to each source and scan; nothing
//! here is process-global. Build it with [`ScannerConfigBuilder`], either
//! from literals or from the environment via
//! [`ScannerConfigBuilder::from_env`].

use std::time::Duration;

use solana_sdk::commitment_config::CommitmentConfig;

use crate::common::error::{Result, TradeScannerError};

/// Default enriched-history API base URL.
pub const DEFAULT_HELIUS_API_URL: &str = "https://api.helius.xyz";

/// Log keywords that mark a transaction as a likely swap.
pub const DEFAULT_BUY_KEYWORDS: [&str; 4] = ["ray_log", "swap", "trade", "buy"];

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 1000;
const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Finality level requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitmentLevel {
    Processed,
    Confirmed,
    #[default]
    Finalized,
}

impl CommitmentLevel {
    #[must_use]
    pub fn to_commitment_config(self) -> CommitmentConfig {
        match self {
            CommitmentLevel::Processed => CommitmentConfig::processed(),
            CommitmentLevel::Confirmed => CommitmentConfig::confirmed(),
            CommitmentLevel::Finalized => CommitmentConfig::finalized(),
        }
    }
}

impl std::str::FromStr for CommitmentLevel {
    type Err = TradeScannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "processed" => Ok(CommitmentLevel::Processed),
            "confirmed" => Ok(CommitmentLevel::Confirmed),
            "finalized" => Ok(CommitmentLevel::Finalized),
            other => Err(TradeScannerError::ConfigError(format!(
                "unknown commitment level: {other}"
            ))),
        }
    }
}

/// Credentials for the enriched-history provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeliusConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Validated scanner configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    rpc_url: Option<String>,
    helius: Option<HeliusConfig>,
    /// Signatures (or enriched records) requested per page.
    pub page_size: usize,
    /// Maximum concurrent per-signature detail requests.
    pub concurrency: usize,
    pub commitment: CommitmentLevel,
    pub request_timeout: Duration,
    /// Optional cap on pages fetched per scan.
    pub max_pages: Option<usize>,
    /// Keywords for the heuristic buy detector, lower-cased.
    pub keywords: Vec<String>,
}

impl ScannerConfig {
    /// The raw JSON-RPC endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TradeScannerError::ConfigError`] if no endpoint was set.
    pub fn rpc_url(&self) -> Result<&str> {
        self.rpc_url
            .as_deref()
            .ok_or_else(|| TradeScannerError::ConfigError("RPC_URL is not set".to_string()))
    }

    /// Enriched-history provider settings.
    ///
    /// # Errors
    ///
    /// Returns [`TradeScannerError::ConfigError`] if no API key was set.
    pub fn helius(&self) -> Result<&HeliusConfig> {
        self.helius.as_ref().ok_or_else(|| {
            TradeScannerError::ConfigError("HELIUS_API_KEY is not set".to_string())
        })
    }
}

/// Builder for [`ScannerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ScannerConfigBuilder {
    rpc_url: Option<String>,
    rpc_api_key: Option<String>,
    helius_url: Option<String>,
    helius_api_key: Option<String>,
    page_size: Option<usize>,
    concurrency: Option<usize>,
    commitment: Option<CommitmentLevel>,
    request_timeout: Option<Duration>,
    max_pages: Option<usize>,
    keywords: Option<Vec<String>>,
}

impl ScannerConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the builder from `RPC_URL`, `RPC_API_KEY`, `HELIUS_API_URL`,
    /// `HELIUS_API_KEY` and `RPC_COMMITMENT`. Unset variables are left
    /// unset; `build` decides whether that is an error.
    ///
    /// # Errors
    ///
    /// Returns [`TradeScannerError::ConfigError`] if `RPC_COMMITMENT` is not
    /// a known commitment level.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::new();
        if let Some(url) = env_var("RPC_URL") {
            builder = builder.with_rpc(url);
        }
        if let Some(key) = env_var("RPC_API_KEY") {
            builder = builder.with_rpc_api_key(key);
        }
        if let Some(key) = env_var("HELIUS_API_KEY") {
            let url = env_var("HELIUS_API_URL").unwrap_or_else(|| DEFAULT_HELIUS_API_URL.to_string());
            builder = builder.with_helius(url, key);
        }
        if let Some(level) = env_var("RPC_COMMITMENT") {
            builder = builder.with_commitment(level.parse()?);
        }
        Ok(builder)
    }

    #[must_use]
    pub fn with_rpc(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    /// API key appended to the RPC URL as `api-key` when the URL lacks one.
    #[must_use]
    pub fn with_rpc_api_key(mut self, key: impl Into<String>) -> Self {
        self.rpc_api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_helius(mut self, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.helius_url = Some(base_url.into());
        self.helius_api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    #[must_use]
    pub fn with_commitment(mut self, commitment: CommitmentLevel) -> Self {
        self.commitment = Some(commitment);
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TradeScannerError::ConfigError`] if neither provider is
    /// configured, a numeric setting is out of range or no keyword is left.
    pub fn build(self) -> Result<ScannerConfig> {
        if self.rpc_url.is_none() && self.helius_api_key.is_none() {
            return Err(TradeScannerError::ConfigError(
                "no provider configured: set RPC_URL or HELIUS_API_KEY".to_string(),
            ));
        }

        let rpc_url = self
            .rpc_url
            .map(|url| with_api_key(url, self.rpc_api_key.as_deref()));

        let helius = match (self.helius_url, self.helius_api_key) {
            (_, Some(key)) if key.trim().is_empty() => {
                return Err(TradeScannerError::ConfigError(
                    "HELIUS_API_KEY is empty".to_string(),
                ));
            }
            (url, Some(api_key)) => Some(HeliusConfig {
                base_url: url
                    .unwrap_or_else(|| DEFAULT_HELIUS_API_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                api_key,
            }),
            (_, None) => None,
        };

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(TradeScannerError::ConfigError(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }

        let concurrency = self.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(TradeScannerError::ConfigError(
                "concurrency must be at least 1".to_string(),
            ));
        }

        if self.max_pages == Some(0) {
            return Err(TradeScannerError::ConfigError(
                "max pages must be at least 1".to_string(),
            ));
        }

        let keywords: Vec<String> = self
            .keywords
            .unwrap_or_else(|| DEFAULT_BUY_KEYWORDS.iter().map(|k| (*k).to_string()).collect())
            .into_iter()
            .map(|k| k.to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(TradeScannerError::ConfigError(
                "at least one buy keyword is required".to_string(),
            ));
        }

        Ok(ScannerConfig {
            rpc_url,
            helius,
            page_size,
            concurrency,
            commitment: self.commitment.unwrap_or_default(),
            request_timeout: self
                .request_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            max_pages: self.max_pages,
            keywords,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn with_api_key(url: String, key: Option<&str>) -> String {
    match key {
        Some(key) if !url.contains("api-key=") => {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{url}{separator}api-key={key}")
        }
        _ => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScannerConfigBuilder::new()
            .with_rpc("http://localhost:8899")
            .build()
            .unwrap();

        assert_eq!(config.page_size, 50);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.commitment, CommitmentLevel::Finalized);
        assert_eq!(config.keywords, vec!["ray_log", "swap", "trade", "buy"]);
        assert!(config.max_pages.is_none());
        assert!(config.helius().is_err());
    }

    #[test]
    fn test_requires_a_provider() {
        let err = ScannerConfigBuilder::new().build().unwrap_err();
        assert!(matches!(err, TradeScannerError::ConfigError(_)));
    }

    #[test]
    fn test_rejects_bad_limits() {
        let base = ScannerConfigBuilder::new().with_rpc("http://localhost:8899");
        assert!(base.clone().with_page_size(0).build().is_err());
        assert!(base.clone().with_page_size(1001).build().is_err());
        assert!(base.clone().with_concurrency(0).build().is_err());
        assert!(base.clone().with_max_pages(0).build().is_err());
        assert!(base.with_keywords(Vec::<String>::new()).build().is_err());
    }

    #[test]
    fn test_rpc_api_key_is_appended() {
        let config = ScannerConfigBuilder::new()
            .with_rpc("https://rpc.example.com/v2")
            .with_rpc_api_key("secret")
            .build()
            .unwrap();
        assert_eq!(config.rpc_url().unwrap(), "https://rpc.example.com/v2?api-key=secret");

        let config = ScannerConfigBuilder::new()
            .with_rpc("https://rpc.example.com/?api-key=inline")
            .with_rpc_api_key("secret")
            .build()
            .unwrap();
        assert_eq!(config.rpc_url().unwrap(), "https://rpc.example.com/?api-key=inline");
    }

    #[test]
    fn test_helius_settings() {
        let config = ScannerConfigBuilder::new()
            .with_helius("https://api.helius.xyz/", "key")
            .with_keywords(["SWAP"])
            .build()
            .unwrap();

        let helius = config.helius().unwrap();
        assert_eq!(helius.base_url, "https://api.helius.xyz");
        assert_eq!(helius.api_key, "key");
        assert_eq!(config.keywords, vec!["swap"]);
        assert!(config.rpc_url().is_err());

        assert!(ScannerConfigBuilder::new().with_helius("https://x", " ").build().is_err());
    }

    #[test]
    fn test_commitment_parsing() {
        assert_eq!("Confirmed".parse::<CommitmentLevel>().unwrap(), CommitmentLevel::Confirmed);
        assert!("final".parse::<CommitmentLevel>().is_err());
        assert_eq!(
            CommitmentLevel::Processed.to_commitment_config(),
            CommitmentConfig::processed()
        );
    }
}
