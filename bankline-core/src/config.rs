//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "store": { "databaseFile": "bankline.duckdb", "transferTimeoutMs": 5000 }
//! }
//! ```
//! Unknown keys are ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_DATABASE_FILE: &str = "bankline.duckdb";
const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 5_000;

/// Raw settings.json structure
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    store: StoreSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreSettings {
    #[serde(default)]
    database_file: Option<String>,
    #[serde(default)]
    transfer_timeout_ms: Option<u64>,
}

/// Bankline configuration (resolved view of settings and environment)
#[derive(Debug, Clone)]
pub struct Config {
    /// Ledger database file name, relative to the data directory
    pub database_file: String,
    /// How long a single transfer may take before it is rolled back
    pub transfer_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            transfer_timeout: Duration::from_millis(DEFAULT_TRANSFER_TIMEOUT_MS),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// Environment variables take precedence over the settings file:
    /// `BANKLINE_DB_FILE` and `BANKLINE_TRANSFER_TIMEOUT_MS`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings file {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let database_file = std::env::var("BANKLINE_DB_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| raw.store.database_file.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_string());

        let timeout_ms = match std::env::var("BANKLINE_TRANSFER_TIMEOUT_MS") {
            Ok(value) => value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("BANKLINE_TRANSFER_TIMEOUT_MS is not a number: {}", value))?,
            Err(_) => raw
                .store
                .transfer_timeout_ms
                .unwrap_or(DEFAULT_TRANSFER_TIMEOUT_MS),
        };

        Ok(Self {
            database_file,
            transfer_timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Full path of the ledger database
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database_file)
    }
}
