//! Concurrent transfer tests
//!
//! Many threads call the transfer engine at once against the same accounts,
//! using a real on-disk DuckDB database. Results are collected through a
//! shared vector and checked after every thread has joined.
//!
//! Run with: cargo test --test concurrent_transfer_test -- --nocapture

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use tempfile::TempDir;

use bankline_core::adapters::duckdb::DuckDbRepository;
use bankline_core::services::TransferService;
use bankline_core::{
    Account, CreateAccountParams, LedgerQueries, TransferTxParams, TransferTxResult, TxContext,
};

/// Helper: repository on a fresh database file with schema applied
fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let db_path = temp_dir.path().join("concurrent.duckdb");
    let repo = DuckDbRepository::new(&db_path).expect("Failed to create repository");
    repo.ensure_schema().expect("Failed to initialize schema");
    Arc::new(repo)
}

fn open_account(repo: &DuckDbRepository, owner: &str, balance: i64) -> Account {
    repo.with_queries(|q| q.create_account(&CreateAccountParams::new(owner, balance, "USD")))
        .unwrap()
}

fn get_account(repo: &DuckDbRepository, id: i64) -> Account {
    repo.with_queries(|q| q.get_account(id)).unwrap()
}

/// Run one transfer per entry of `transfers`, all released at the same time
fn run_concurrently(
    service: Arc<TransferService>,
    transfers: Vec<TransferTxParams>,
) -> (Vec<TransferTxResult>, usize) {
    let barrier = Arc::new(Barrier::new(transfers.len()));
    let results = Arc::new(Mutex::new(Vec::new()));
    let error_count = Arc::new(AtomicUsize::new(0));

    let mut handles = vec![];

    for (i, params) in transfers.into_iter().enumerate() {
        let barrier = Arc::clone(&barrier);
        let service = Arc::clone(&service);
        let results = Arc::clone(&results);
        let error_count = Arc::clone(&error_count);

        handles.push(thread::spawn(move || {
            barrier.wait();
            match service.transfer_tx(&TxContext::background(), params) {
                Ok(result) => results.lock().unwrap().push(result),
                Err(e) => {
                    eprintln!("Transfer {}: {}", i, e);
                    error_count.fetch_add(1, Ordering::SeqCst);
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let results = std::mem::take(&mut *results.lock().unwrap());
    (results, error_count.load(Ordering::SeqCst))
}

/// N concurrent X -> Y transfers: every transfer applies exactly once and
/// each one observes a different intermediate balance.
#[test]
fn test_concurrent_transfers_no_lost_updates() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = Arc::new(TransferService::new(Arc::clone(&repo)));

    let account1 = open_account(&repo, "alice", 1000);
    let account2 = open_account(&repo, "bob", 0);

    let n = 5;
    let amount = 10;
    let transfers = vec![TransferTxParams::new(account1.id, account2.id, amount); n];

    let (results, errors) = run_concurrently(service, transfers);
    assert_eq!(errors, 0);
    assert_eq!(results.len(), n);

    let mut seen_multiples = HashSet::new();
    let mut transfer_ids = HashSet::new();
    let mut entry_ids = HashSet::new();

    for result in &results {
        let transfer = &result.transfer;
        assert_eq!(transfer.from_account_id, account1.id);
        assert_eq!(transfer.to_account_id, account2.id);
        assert_eq!(transfer.amount, amount);
        assert!(transfer.id > 0);
        repo.with_queries(|q| q.get_transfer(transfer.id)).unwrap();

        assert_eq!(result.from_entry.account_id, account1.id);
        assert_eq!(result.from_entry.amount, -amount);
        assert_eq!(result.to_entry.account_id, account2.id);
        assert_eq!(result.to_entry.amount, amount);
        repo.with_queries(|q| q.get_entry(result.from_entry.id)).unwrap();
        repo.with_queries(|q| q.get_entry(result.to_entry.id)).unwrap();

        // Both sides moved by the same amount, a multiple of the transfer size
        let diff1 = account1.balance - result.from_account.balance;
        let diff2 = result.to_account.balance - account2.balance;
        assert_eq!(diff1, diff2);
        assert!(diff1 > 0);
        assert_eq!(diff1 % amount, 0);

        let k = diff1 / amount;
        assert!((1..=n as i64).contains(&k));
        assert!(seen_multiples.insert(k), "two transfers observed the same balance");

        transfer_ids.insert(transfer.id);
        entry_ids.insert(result.from_entry.id);
        entry_ids.insert(result.to_entry.id);
    }

    assert_eq!(transfer_ids.len(), n);
    assert_eq!(entry_ids.len(), 2 * n);

    assert_eq!(get_account(&repo, account1.id).balance, 950);
    assert_eq!(get_account(&repo, account2.id).balance, 50);
}

/// Transfers alternating direction between the same two accounts all
/// complete, and the balances end where they started.
#[test]
fn test_concurrent_transfers_both_directions() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = Arc::new(TransferService::new(Arc::clone(&repo)));

    let account1 = open_account(&repo, "alice", 500);
    let account2 = open_account(&repo, "bob", 500);

    let n = 10;
    let amount = 10;
    let transfers = (0..n)
        .map(|i| {
            if i % 2 == 0 {
                TransferTxParams::new(account1.id, account2.id, amount)
            } else {
                TransferTxParams::new(account2.id, account1.id, amount)
            }
        })
        .collect();

    let (results, errors) = run_concurrently(service, transfers);
    assert_eq!(errors, 0);
    assert_eq!(results.len(), n);

    assert_eq!(get_account(&repo, account1.id).balance, account1.balance);
    assert_eq!(get_account(&repo, account2.id).balance, account2.balance);
}

/// Money is conserved across many accounts under mixed concurrent load
#[test]
fn test_concurrent_transfers_conserve_total() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = Arc::new(TransferService::new(Arc::clone(&repo)));

    let accounts: Vec<Account> = (0..4)
        .map(|i| open_account(&repo, &format!("owner{}", i), 1000))
        .collect();

    let transfers = (0..12)
        .map(|i| {
            let from = &accounts[i % accounts.len()];
            let to = &accounts[(i + 1 + i / accounts.len()) % accounts.len()];
            TransferTxParams::new(from.id, to.id, (i as i64 + 1) * 3)
        })
        .filter(|p| p.from_account_id != p.to_account_id)
        .collect::<Vec<_>>();
    let expected = transfers.len();

    let (results, errors) = run_concurrently(service, transfers);
    assert_eq!(errors, 0);
    assert_eq!(results.len(), expected);

    let total: i64 = accounts
        .iter()
        .map(|a| get_account(&repo, a.id).balance)
        .sum();
    assert_eq!(total, 4000);
}
