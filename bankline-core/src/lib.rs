//! Bankline Core - transactional funds transfers over a double-entry ledger
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Ledger entities (Account, Entry, Transfer), lock ordering, errors
//! - **ports**: Trait definitions for storage (`LedgerQueries`)
//! - **services**: The transfer engine and its supporting services
//! - **adapters**: Concrete implementations (DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    lock_order, Account, BalanceUpdate, CreateAccountParams, Entry, ListAccountsParams, Transfer,
    TransferRequest, TransferTxParams, TransferTxResult, TxContext,
};
pub use ports::LedgerQueries;
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Main context for Bankline operations
///
/// Holds the configuration, the ledger database and the services built on it.
pub struct BanklineContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub transfer_service: TransferService,
    pub status_service: StatusService,
}

impl BanklineContext {
    /// Open the ledger in `data_dir`, applying pending migrations
    ///
    /// When a logger is given, transfer outcomes are recorded in it.
    pub fn new(data_dir: &Path, logger: Option<Arc<LoggingService>>) -> Result<Self> {
        let config = Config::load(data_dir)?;

        let db_path = config.database_path(data_dir);
        let repository = Arc::new(
            DuckDbRepository::new(&db_path)
                .with_context(|| format!("Failed to open ledger database {}", db_path.display()))?,
        );

        repository
            .ensure_schema()
            .context("Failed to apply ledger migrations")?;

        let mut transfer_service = TransferService::new(Arc::clone(&repository));
        if let Some(logger) = logger {
            transfer_service = transfer_service.with_logger(logger);
        }
        let status_service = StatusService::new(Arc::clone(&repository));

        Ok(Self {
            config,
            repository,
            transfer_service,
            status_service,
        })
    }

    /// A fresh caller context bounded by the configured transfer timeout
    pub fn transfer_context(&self) -> TxContext {
        TxContext::with_timeout(self.config.transfer_timeout)
    }
}
