//! Status service - ledger summary and double-entry audit

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::duckdb::{DuckDbRepository, LedgerTable};
use crate::domain::result::Result;

/// Status service for ledger summaries
pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Get overall status summary
    pub fn get_status(&self) -> Result<StatusSummary> {
        let transfer_entry_sum = self.repository.transfer_entry_sum()?;
        let unbalanced_transfers = self.repository.unbalanced_transfers()?;

        Ok(StatusSummary {
            total_accounts: self.repository.count_rows(LedgerTable::Accounts)?,
            total_entries: self.repository.count_rows(LedgerTable::Entries)?,
            total_transfers: self.repository.count_rows(LedgerTable::Transfers)?,
            balances: self
                .repository
                .balance_totals()?
                .into_iter()
                .map(|(currency, total)| CurrencyTotal { currency, total })
                .collect(),
            ledger_balanced: transfer_entry_sum == 0 && unbalanced_transfers.is_empty(),
            transfer_entry_sum,
            unbalanced_transfers,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_accounts: i64,
    pub total_entries: i64,
    pub total_transfers: i64,
    pub balances: Vec<CurrencyTotal>,
    /// True when every transfer has exactly its two matching entries
    pub ledger_balanced: bool,
    /// Sum of all transfer entries; zero in a consistent ledger
    pub transfer_entry_sum: i64,
    pub unbalanced_transfers: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct CurrencyTotal {
    pub currency: String,
    /// Sum of balances in minor units
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreateAccountParams, CreateEntryParams, TransferTxParams, TxContext};
    use crate::ports::LedgerQueries;
    use crate::services::TransferService;

    #[test]
    fn test_status_after_transfers() {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        let (a, b, _) = repo
            .with_queries(|q| {
                Ok((
                    q.create_account(&CreateAccountParams::new("alice", 100, "USD"))?,
                    q.create_account(&CreateAccountParams::new("bob", 50, "USD"))?,
                    q.create_account(&CreateAccountParams::new("carl", 5, "EUR"))?,
                ))
            })
            .unwrap();

        let transfers = TransferService::new(Arc::clone(&repo));
        let ctx = TxContext::background();
        transfers.transfer_tx(&ctx, TransferTxParams::new(a.id, b.id, 30)).unwrap();
        transfers.transfer_tx(&ctx, TransferTxParams::new(b.id, a.id, 5)).unwrap();

        let status = StatusService::new(Arc::clone(&repo)).get_status().unwrap();
        assert_eq!(status.total_accounts, 3);
        assert_eq!(status.total_transfers, 2);
        assert_eq!(status.total_entries, 4);
        assert!(status.ledger_balanced);
        assert_eq!(status.balances.len(), 2);
        assert_eq!(status.balances[0].currency, "EUR");
        assert_eq!(status.balances[0].total, 5);
        assert_eq!(status.balances[1].total, 150);
    }

    #[test]
    fn test_status_flags_orphan_entry() {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        repo.with_queries(|q| {
            let account = q.create_account(&CreateAccountParams::new("dora", 0, "USD"))?;
            q.create_entry(&CreateEntryParams {
                account_id: account.id,
                transfer_id: Some(99),
                amount: 10,
            })
        })
        .unwrap();

        let status = StatusService::new(repo).get_status().unwrap();
        assert!(!status.ledger_balanced);
        assert_eq!(status.transfer_entry_sum, 10);
    }
}
