//! Core domain entities
//!
//! All ledger entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod context;
mod entry;
pub mod lock_order;
pub mod money;
pub mod result;
mod transfer;

pub use account::{Account, CreateAccountParams, ListAccountsParams};
pub use context::TxContext;
pub use entry::{CreateEntryParams, Entry};
pub use lock_order::{lock_order, BalanceUpdate};
pub use transfer::{
    CreateTransferParams, Transfer, TransferRequest, TransferTxParams, TransferTxResult,
};
