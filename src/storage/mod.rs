//! JSON snapshot files passed between pipeline stages.
//!
//! Each stage writes its result as pretty-printed JSON into the snapshot
//! directory and the next stage reads it back by name.

use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::common::error::{Result, TradeScannerError};
use crate::common::logging::{self, LogLevel};

pub const FOCUS_TRADES_FILE: &str = "focus_trades.json";
pub const SURROUNDING_TRADES_FILE: &str = "surrounding_trades.json";
pub const TOKEN_BUYS_FILE: &str = "token_buys.json";
pub const TOKEN_BUYS_WITH_SURROUNDING_FILE: &str = "token_buys_with_surrounding.json";
pub const TOKEN_ACCOUNTS_FILE: &str = "token_accounts.json";

/// Directory of named JSON snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the snapshot called `name`.
    #[must_use]
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Reads and decodes snapshot `name`.
    ///
    /// # Errors
    ///
    /// A missing file is a [`TradeScannerError::SnapshotMissing`] and a file
    /// that does not decode is a [`TradeScannerError::SnapshotError`]. Other
    /// read failures are I/O errors.
    pub async fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.path(name);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TradeScannerError::SnapshotMissing(format!(
                    "{} not found",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents).map_err(|e| {
            TradeScannerError::SnapshotError(format!("{} is not valid: {e}", path.display()))
        })
    }

    /// Encodes `value` as pretty JSON and writes it to snapshot `name`,
    /// creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path(name);
        let json = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&path, json).await?;

        logging::log(
            LogLevel::Success,
            &format!("Saved {}", path.display()),
        );
        Ok(path)
    }
}
