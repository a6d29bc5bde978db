//! Repository port - ledger data access

use crate::domain::result::Result;
use crate::domain::{
    Account, CreateAccountParams, CreateEntryParams, CreateTransferParams, Entry,
    ListAccountsParams, Transfer,
};

/// Ledger queries bound to one execution scope
///
/// An implementation runs either directly against the store or inside an
/// open unit of work; callers cannot tell the difference. Lookups of a
/// missing row fail with `Error::NotFound`, every other storage failure with
/// `Error::Database`.
pub trait LedgerQueries {
    // === Accounts ===

    /// Open a new account
    fn create_account(&self, params: &CreateAccountParams) -> Result<Account>;

    /// Get account by ID
    fn get_account(&self, id: i64) -> Result<Account>;

    /// List accounts ordered by id
    fn list_accounts(&self, params: &ListAccountsParams) -> Result<Vec<Account>>;

    /// Atomically add `amount` to an account's balance and return the updated row
    ///
    /// Must be a single read-modify-write statement in the store.
    fn add_account_balance(&self, id: i64, amount: i64) -> Result<Account>;

    // === Entries ===

    fn create_entry(&self, params: &CreateEntryParams) -> Result<Entry>;

    fn get_entry(&self, id: i64) -> Result<Entry>;

    /// Entries of one account, newest first
    fn list_entries(&self, account_id: i64, limit: i64, offset: i64) -> Result<Vec<Entry>>;

    /// Entries written by one transfer, debit first
    fn entries_for_transfer(&self, transfer_id: i64) -> Result<Vec<Entry>>;

    // === Transfers ===

    fn create_transfer(&self, params: &CreateTransferParams) -> Result<Transfer>;

    fn get_transfer(&self, id: i64) -> Result<Transfer>;

    /// Transfers between two accounts in either direction, newest first
    fn list_transfers(
        &self,
        account_a: i64,
        account_b: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transfer>>;
}
