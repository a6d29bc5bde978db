//! Account domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ledger account holding a balance in a single currency
///
/// The balance is expressed in minor units (cents) and is only ever changed
/// by the transfer engine, inside the same unit of work that records the
/// matching entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub owner: String,
    pub balance: i64,
    /// ISO 4217 currency code, normalized to uppercase
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Normalize currency code to uppercase
    pub fn normalize_currency(currency: &str) -> String {
        currency.trim().to_uppercase()
    }
}

/// Input for opening a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountParams {
    pub owner: String,
    pub balance: i64,
    pub currency: String,
}

impl CreateAccountParams {
    pub fn new(owner: impl Into<String>, balance: i64, currency: &str) -> Self {
        Self {
            owner: owner.into(),
            balance,
            currency: Account::normalize_currency(currency),
        }
    }

    /// Validate account data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.owner.trim().is_empty() {
            return Err("account owner cannot be empty");
        }
        if self.currency.trim().is_empty() {
            return Err("currency cannot be empty");
        }
        Ok(())
    }
}

/// Filter and paging for account listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAccountsParams {
    pub owner: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListAccountsParams {
    fn default() -> Self {
        Self {
            owner: None,
            limit: 50,
            offset: 0,
        }
    }
}
