//! Transfer domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::{Account, Entry};

/// Immutable record of one funds movement between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,
    /// Always positive, in minor units
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTransferParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

/// Input of the transfer engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

impl TransferTxParams {
    pub fn new(from_account_id: i64, to_account_id: i64, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    /// Reject inputs that can never produce a valid transfer
    pub fn validate(&self) -> Result<()> {
        if self.from_account_id <= 0 {
            return Err(Error::validation("from_account_id must be a positive account id"));
        }
        if self.to_account_id <= 0 {
            return Err(Error::validation("to_account_id must be a positive account id"));
        }
        if self.from_account_id == self.to_account_id {
            return Err(Error::validation("cannot transfer to the same account"));
        }
        if self.amount <= 0 {
            return Err(Error::validation(format!(
                "amount must be greater than zero, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

/// Everything a committed transfer produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferTxResult {
    pub transfer: Transfer,
    pub from_entry: Entry,
    pub to_entry: Entry,
    /// Snapshot of the source account after the transfer
    pub from_account: Account,
    /// Snapshot of the destination account after the transfer
    pub to_account: Account,
}

/// A transfer as requested by a caller, before its preconditions are checked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub params: TransferTxParams,
    /// Currency both accounts must be held in
    pub currency: String,
    /// Authenticated requester; when set, must own the source account
    pub owner: Option<String>,
}
