//! Ledger entry domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One append-only line of an account's ledger
///
/// Negative amounts are debits, positive amounts are credits. Entries written
/// by a transfer carry its id; entries recorded by other collaborators
/// (for example an opening deposit) have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub account_id: i64,
    pub transfer_id: Option<i64>,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}

#[derive(Debug, Clone)]
pub struct CreateEntryParams {
    pub account_id: i64,
    pub transfer_id: Option<i64>,
    pub amount: i64,
}
