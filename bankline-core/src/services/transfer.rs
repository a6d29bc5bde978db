//! Transfer service - moves money between two accounts as one unit of work
//!
//! A transfer writes one `transfers` row, a debit and a credit entry, and two
//! balance updates. All five writes commit together or not at all.

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, CreateEntryParams, CreateTransferParams, Entry, Transfer, TransferRequest,
    TransferTxParams, TransferTxResult, TxContext,
};
use crate::ports::LedgerQueries;
use crate::services::logging::{LogEvent, LoggingService};

/// The records written for one transfer, before balances are touched
#[derive(Debug, Clone, Serialize)]
pub struct RecordedTransfer {
    pub transfer: Transfer,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

/// Write the transfer row, then the debit entry, then the credit entry
pub fn record_transfer<Q: LedgerQueries + ?Sized>(
    queries: &Q,
    params: &TransferTxParams,
) -> Result<RecordedTransfer> {
    let transfer = queries.create_transfer(&CreateTransferParams {
        from_account_id: params.from_account_id,
        to_account_id: params.to_account_id,
        amount: params.amount,
    })?;

    let from_entry = queries.create_entry(&CreateEntryParams {
        account_id: params.from_account_id,
        transfer_id: Some(transfer.id),
        amount: -params.amount,
    })?;

    let to_entry = queries.create_entry(&CreateEntryParams {
        account_id: params.to_account_id,
        transfer_id: Some(transfer.id),
        amount: params.amount,
    })?;

    Ok(RecordedTransfer {
        transfer,
        from_entry,
        to_entry,
    })
}

/// Apply a signed delta to one balance in a single store statement
pub fn apply_delta<Q: LedgerQueries + ?Sized>(
    queries: &Q,
    account_id: i64,
    delta: i64,
) -> Result<Account> {
    queries.add_account_balance(account_id, delta)
}

/// Body of a transfer, run inside an already open unit of work
pub(crate) fn execute_transfer<Q: LedgerQueries + ?Sized>(
    ctx: &TxContext,
    queries: &Q,
    params: &TransferTxParams,
) -> Result<TransferTxResult> {
    let recorded = record_transfer(queries, params)?;
    ctx.check()?;

    for update in params.balance_updates() {
        apply_delta(queries, update.account_id, update.delta)?;
        ctx.check()?;
    }

    let from_account = queries.get_account(params.from_account_id)?;
    let to_account = queries.get_account(params.to_account_id)?;

    Ok(TransferTxResult {
        transfer: recorded.transfer,
        from_entry: recorded.from_entry,
        to_entry: recorded.to_entry,
        from_account,
        to_account,
    })
}

/// Transfer service - the public entry point of the engine
pub struct TransferService {
    repository: Arc<DuckDbRepository>,
    logger: Option<Arc<LoggingService>>,
}

impl TransferService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self {
            repository,
            logger: None,
        }
    }

    /// Record transfer outcomes in the event log
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Move `params.amount` from one account to another atomically
    ///
    /// Invalid input is rejected before the store is touched. Any failure
    /// inside the unit of work rolls back every write made so far and is
    /// returned as is; a failed rollback is reported along with its cause.
    pub fn transfer_tx(&self, ctx: &TxContext, params: TransferTxParams) -> Result<TransferTxResult> {
        params.validate()?;

        let result = self
            .repository
            .exec_tx(ctx, |queries| execute_transfer(ctx, queries, &params));

        self.log_outcome(&result);
        result
    }

    /// Check the preconditions a caller owes the engine before a transfer
    ///
    /// Both accounts must exist and be held in the requested currency, and
    /// the requester, when known, must own the source account. Returns the
    /// two accounts as read, without locking them.
    pub fn precheck(&self, request: &TransferRequest) -> Result<(Account, Account)> {
        request.params.validate()?;
        let currency = Account::normalize_currency(&request.currency);

        let (from, to) = self.repository.with_queries(|queries| {
            let from = queries.get_account(request.params.from_account_id)?;
            let to = queries.get_account(request.params.to_account_id)?;
            Ok((from, to))
        })?;

        for account in [&from, &to] {
            if account.currency != currency {
                return Err(Error::validation(format!(
                    "account [{}] currency {} does not match {}",
                    account.id, account.currency, currency
                )));
            }
        }

        if let Some(owner) = &request.owner {
            if &from.owner != owner {
                return Err(Error::Unauthorized(format!(
                    "account [{}] does not belong to the requester",
                    from.id
                )));
            }
        }

        Ok((from, to))
    }

    /// Precheck a request, then execute it
    pub fn transfer_checked(
        &self,
        ctx: &TxContext,
        request: &TransferRequest,
    ) -> Result<TransferTxResult> {
        self.precheck(request)?;
        self.transfer_tx(ctx, request.params)
    }

    fn log_outcome(&self, result: &Result<TransferTxResult>) {
        let Some(logger) = &self.logger else {
            return;
        };
        let event = match result {
            Ok(_) => LogEvent::new("transfer_committed"),
            Err(e) => LogEvent::new("transfer_failed").with_error(e.to_string()),
        };
        // Logging must never change the outcome of a transfer
        let _ = logger.log(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::adapters::duckdb::LedgerTable;
    use crate::domain::{CreateAccountParams, ListAccountsParams};

    fn setup() -> (Arc<DuckDbRepository>, TransferService) {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        let service = TransferService::new(Arc::clone(&repo));
        (repo, service)
    }

    fn open_account(repo: &DuckDbRepository, owner: &str, balance: i64, currency: &str) -> Account {
        repo.with_queries(|q| q.create_account(&CreateAccountParams::new(owner, balance, currency)))
            .unwrap()
    }

    fn balance(repo: &DuckDbRepository, id: i64) -> i64 {
        repo.with_queries(|q| q.get_account(id)).unwrap().balance
    }

    /// Delegates to real queries but fails the Nth entry insert
    struct FailingEntries<'a, Q> {
        inner: &'a Q,
        fail_on_entry: usize,
        entries_seen: Cell<usize>,
    }

    impl<Q: LedgerQueries> LedgerQueries for FailingEntries<'_, Q> {
        fn create_account(&self, params: &CreateAccountParams) -> Result<Account> {
            self.inner.create_account(params)
        }
        fn get_account(&self, id: i64) -> Result<Account> {
            self.inner.get_account(id)
        }
        fn list_accounts(&self, params: &ListAccountsParams) -> Result<Vec<Account>> {
            self.inner.list_accounts(params)
        }
        fn add_account_balance(&self, id: i64, amount: i64) -> Result<Account> {
            self.inner.add_account_balance(id, amount)
        }
        fn create_entry(&self, params: &CreateEntryParams) -> Result<Entry> {
            let seen = self.entries_seen.get() + 1;
            self.entries_seen.set(seen);
            if seen == self.fail_on_entry {
                return Err(Error::database("injected entry failure"));
            }
            self.inner.create_entry(params)
        }
        fn get_entry(&self, id: i64) -> Result<Entry> {
            self.inner.get_entry(id)
        }
        fn list_entries(&self, account_id: i64, limit: i64, offset: i64) -> Result<Vec<Entry>> {
            self.inner.list_entries(account_id, limit, offset)
        }
        fn entries_for_transfer(&self, transfer_id: i64) -> Result<Vec<Entry>> {
            self.inner.entries_for_transfer(transfer_id)
        }
        fn create_transfer(&self, params: &CreateTransferParams) -> Result<Transfer> {
            self.inner.create_transfer(params)
        }
        fn get_transfer(&self, id: i64) -> Result<Transfer> {
            self.inner.get_transfer(id)
        }
        fn list_transfers(&self, a: i64, b: i64, limit: i64, offset: i64) -> Result<Vec<Transfer>> {
            self.inner.list_transfers(a, b, limit, offset)
        }
    }

    #[test]
    fn test_transfer_scenario() {
        let (repo, service) = setup();
        let a = open_account(&repo, "alice", 100, "USD");
        let b = open_account(&repo, "bob", 50, "USD");

        let result = service
            .transfer_tx(&TxContext::background(), TransferTxParams::new(a.id, b.id, 30))
            .unwrap();

        assert_eq!(result.transfer.from_account_id, a.id);
        assert_eq!(result.transfer.to_account_id, b.id);
        assert_eq!(result.transfer.amount, 30);
        assert_eq!((result.from_entry.account_id, result.from_entry.amount), (a.id, -30));
        assert_eq!((result.to_entry.account_id, result.to_entry.amount), (b.id, 30));
        assert_eq!(result.from_entry.transfer_id, Some(result.transfer.id));
        assert_eq!(result.from_account.balance, 70);
        assert_eq!(result.to_account.balance, 80);
        assert_eq!(balance(&repo, a.id), 70);
        assert_eq!(balance(&repo, b.id), 80);
    }

    #[test]
    fn test_injected_failure_after_transfer_row_leaves_nothing() {
        let (repo, _service) = setup();
        let a = open_account(&repo, "alice", 100, "USD");
        let b = open_account(&repo, "bob", 50, "USD");
        let params = TransferTxParams::new(a.id, b.id, 30);
        let ctx = TxContext::background();

        for fail_on_entry in [1, 2] {
            let result = repo.exec_tx(&ctx, |queries| {
                let failing = FailingEntries {
                    inner: queries,
                    fail_on_entry,
                    entries_seen: Cell::new(0),
                };
                execute_transfer(&ctx, &failing, &params)
            });
            assert!(result.unwrap_err().to_string().contains("injected"));
        }

        assert_eq!(repo.count_rows(LedgerTable::Transfers).unwrap(), 0);
        assert_eq!(repo.count_rows(LedgerTable::Entries).unwrap(), 0);
        assert_eq!(balance(&repo, a.id), 100);
        assert_eq!(balance(&repo, b.id), 50);
    }

    #[test]
    fn test_invalid_amount_has_no_side_effects() {
        let (repo, service) = setup();
        let a = open_account(&repo, "alice", 100, "USD");
        let b = open_account(&repo, "bob", 50, "USD");

        let err = service
            .transfer_tx(&TxContext::background(), TransferTxParams::new(a.id, b.id, 0))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(repo.count_rows(LedgerTable::Transfers).unwrap(), 0);
        assert_eq!(balance(&repo, a.id), 100);
    }

    #[test]
    fn test_unknown_source_is_not_found_and_rolled_back() {
        let (repo, service) = setup();
        let b = open_account(&repo, "bob", 50, "USD");

        let err = service
            .transfer_tx(&TxContext::background(), TransferTxParams::new(9999, b.id, 10))
            .unwrap_err();
        assert!(err.is_not_found(), "{}", err);
        assert_eq!(repo.count_rows(LedgerTable::Transfers).unwrap(), 0);
        assert_eq!(repo.count_rows(LedgerTable::Entries).unwrap(), 0);
        assert_eq!(balance(&repo, b.id), 50);
    }

    #[test]
    fn test_cancelled_context_is_rejected() {
        let (repo, service) = setup();
        let a = open_account(&repo, "alice", 100, "USD");
        let b = open_account(&repo, "bob", 50, "USD");
        let ctx = TxContext::background();
        ctx.cancel();

        let err = service
            .transfer_tx(&ctx, TransferTxParams::new(a.id, b.id, 10))
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
        assert_eq!(balance(&repo, a.id), 100);
    }

    #[test]
    fn test_precheck_rejects_currency_mismatch() {
        let (repo, service) = setup();
        let a = open_account(&repo, "alice", 100, "USD");
        let b = open_account(&repo, "bob", 50, "EUR");

        let request = TransferRequest {
            params: TransferTxParams::new(a.id, b.id, 10),
            currency: "usd".to_string(),
            owner: None,
        };
        let err = service.precheck(&request).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("EUR"));
    }

    #[test]
    fn test_precheck_rejects_foreign_source_account() {
        let (repo, service) = setup();
        let a = open_account(&repo, "alice", 100, "USD");
        let b = open_account(&repo, "bob", 50, "USD");

        let request = TransferRequest {
            params: TransferTxParams::new(a.id, b.id, 10),
            currency: "USD".to_string(),
            owner: Some("bob".to_string()),
        };
        assert!(matches!(
            service.transfer_checked(&TxContext::background(), &request),
            Err(Error::Unauthorized(_))
        ));
        assert_eq!(balance(&repo, a.id), 100);
    }

    #[test]
    fn test_precheck_missing_destination() {
        let (repo, service) = setup();
        let a = open_account(&repo, "alice", 100, "USD");

        let request = TransferRequest {
            params: TransferTxParams::new(a.id, 4242, 10),
            currency: "USD".to_string(),
            owner: Some("alice".to_string()),
        };
        assert!(service.precheck(&request).unwrap_err().is_not_found());
    }

    #[test]
    fn test_outcomes_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(
            LoggingService::new(dir.path(), crate::services::EntryPoint::Cli, "test").unwrap(),
        );
        let (repo, service) = setup();
        let service = service.with_logger(Arc::clone(&logger));
        let a = open_account(&repo, "alice", 100, "USD");
        let b = open_account(&repo, "bob", 50, "USD");

        let ctx = TxContext::background();
        service.transfer_tx(&ctx, TransferTxParams::new(a.id, b.id, 10)).unwrap();
        service.transfer_tx(&ctx, TransferTxParams::new(a.id, 777, 10)).unwrap_err();

        let entries = logger.get_recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        let errors = logger.get_errors(10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].event, "transfer_failed");
    }
}
