//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::types::Type;
use duckdb::{params, Connection, Row};

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, CreateAccountParams, CreateEntryParams, CreateTransferParams, Entry,
    ListAccountsParams, Transfer, TxContext,
};
use crate::ports::LedgerQueries;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Format used to bind timestamps into TIMESTAMP columns
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const ACCOUNT_COLUMNS: &str = "id, owner, balance, currency, created_at::VARCHAR";
const ENTRY_COLUMNS: &str = "id, account_id, transfer_id, amount, created_at::VARCHAR";
const TRANSFER_COLUMNS: &str =
    "id, from_account_id, to_account_id, amount, created_at::VARCHAR";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("could not set lock on file")
        || lower.contains("database is locked")
}

/// DuckDB repository implementation
///
/// Owns a single connection. A unit of work holds it from begin to commit or
/// rollback, so transfers touching the same accounts run one after another.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff when another process holds the file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[bankline] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a private in-memory database (tests, dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading is disabled; the ledger needs none
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Path of the database file, `None` when in memory
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Run read-only or single-statement work outside a unit of work
    pub fn with_queries<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Queries<'_>) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&Queries::new(&conn))
    }

    /// Run `f` as one atomic unit of work
    ///
    /// Everything `f` does through the queries it is handed is committed
    /// together when it returns `Ok`, and rolled back together when it returns
    /// `Err` or when `ctx` has expired by commit time. A failed rollback is
    /// reported together with the error that triggered it. If `f` panics the
    /// transaction is dropped, which rolls it back.
    ///
    /// The connection stays locked for the whole unit of work, so units of
    /// work never overlap, even on disjoint accounts. The order of balance
    /// updates inside a transfer only matters on a row-locking store.
    pub fn exec_tx<T, F>(&self, ctx: &TxContext, f: F) -> Result<T>
    where
        F: FnOnce(&Queries<'_>) -> Result<T>,
    {
        ctx.check()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let outcome = f(&Queries::new(&tx)).and_then(|value| {
            ctx.check()?;
            Ok(value)
        });

        match outcome {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => match tx.rollback() {
                Ok(()) => Err(err),
                Err(rb_err) => Err(Error::rollback(err, rb_err)),
            },
        }
    }

    // === Aggregates for status reporting ===

    pub fn count_rows(&self, table: LedgerTable) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Sum of balances per currency, ordered by currency
    pub fn balance_totals(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT currency, CAST(SUM(balance) AS BIGINT) FROM accounts
             GROUP BY currency ORDER BY currency",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut totals = Vec::new();
        for row in rows {
            totals.push(row?);
        }
        Ok(totals)
    }

    /// Sum of the amounts of all entries written by transfers
    pub fn transfer_entry_sum(&self) -> Result<i64> {
        let conn = self.lock()?;
        let sum: i64 = conn.query_row(
            "SELECT CAST(COALESCE(SUM(amount), 0) AS BIGINT) FROM entries
             WHERE transfer_id IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    /// Ids of transfers that do not have exactly one debit and one credit entry
    /// matching their endpoints and amount
    pub fn unbalanced_transfers(&self) -> Result<Vec<i64>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT t.id FROM transfers t
             LEFT JOIN entries e ON e.transfer_id = t.id
             GROUP BY t.id, t.from_account_id, t.to_account_id, t.amount
             HAVING COUNT(e.id) <> 2
                 OR COUNT(*) FILTER (WHERE e.account_id = t.from_account_id
                                       AND e.amount = -t.amount) <> 1
                 OR COUNT(*) FILTER (WHERE e.account_id = t.to_account_id
                                       AND e.amount = t.amount) <> 1
             ORDER BY t.id",
        )?;
        let ids = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut result = Vec::new();
        for id in ids {
            result.push(id?);
        }
        Ok(result)
    }
}

/// Tables whose rows can be counted for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerTable {
    Accounts,
    Entries,
    Transfers,
}

impl LedgerTable {
    fn name(&self) -> &'static str {
        match self {
            LedgerTable::Accounts => "accounts",
            LedgerTable::Entries => "entries",
            LedgerTable::Transfers => "transfers",
        }
    }
}

/// Ledger queries over a borrowed connection
///
/// Built either from the repository's connection or from an open
/// `duckdb::Transaction` (which derefs to `Connection`), so the same
/// statements run inside and outside a unit of work.
pub struct Queries<'c> {
    conn: &'c Connection,
}

impl<'c> Queries<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn query_one<T, F>(
        &self,
        sql: &str,
        params: &[&dyn duckdb::ToSql],
        what: &str,
        map: F,
    ) -> Result<T>
    where
        F: FnOnce(&Row<'_>) -> duckdb::Result<T>,
    {
        self.conn
            .query_row(sql, params, map)
            .map_err(|e| not_found_or_database(e, what))
    }

    fn query_many<T, F>(
        &self,
        sql: &str,
        params: &[&dyn duckdb::ToSql],
        map: F,
    ) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> duckdb::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, map)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

impl LedgerQueries for Queries<'_> {
    fn create_account(&self, params: &CreateAccountParams) -> Result<Account> {
        params.validate().map_err(Error::validation)?;
        self.query_one(
            &format!(
                "INSERT INTO accounts (owner, balance, currency, created_at)
                 VALUES (?, ?, ?, ?) RETURNING {}",
                ACCOUNT_COLUMNS
            ),
            params![params.owner, params.balance, params.currency, now_timestamp()],
            "account",
            row_to_account,
        )
    }

    fn get_account(&self, id: i64) -> Result<Account> {
        self.query_one(
            &format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS),
            params![id],
            &format!("account {}", id),
            row_to_account,
        )
    }

    fn list_accounts(&self, params: &ListAccountsParams) -> Result<Vec<Account>> {
        match &params.owner {
            Some(owner) => self.query_many(
                &format!(
                    "SELECT {} FROM accounts WHERE owner = ? ORDER BY id LIMIT ? OFFSET ?",
                    ACCOUNT_COLUMNS
                ),
                params![owner, params.limit, params.offset],
                row_to_account,
            ),
            None => self.query_many(
                &format!(
                    "SELECT {} FROM accounts ORDER BY id LIMIT ? OFFSET ?",
                    ACCOUNT_COLUMNS
                ),
                params![params.limit, params.offset],
                row_to_account,
            ),
        }
    }

    fn add_account_balance(&self, id: i64, amount: i64) -> Result<Account> {
        self.query_one(
            &format!(
                "UPDATE accounts SET balance = balance + ? WHERE id = ? RETURNING {}",
                ACCOUNT_COLUMNS
            ),
            params![amount, id],
            &format!("account {}", id),
            row_to_account,
        )
    }

    fn create_entry(&self, params: &CreateEntryParams) -> Result<Entry> {
        self.query_one(
            &format!(
                "INSERT INTO entries (account_id, transfer_id, amount, created_at)
                 VALUES (?, ?, ?, ?) RETURNING {}",
                ENTRY_COLUMNS
            ),
            params![
                params.account_id,
                params.transfer_id,
                params.amount,
                now_timestamp()
            ],
            "entry",
            row_to_entry,
        )
    }

    fn get_entry(&self, id: i64) -> Result<Entry> {
        self.query_one(
            &format!("SELECT {} FROM entries WHERE id = ?", ENTRY_COLUMNS),
            params![id],
            &format!("entry {}", id),
            row_to_entry,
        )
    }

    fn list_entries(&self, account_id: i64, limit: i64, offset: i64) -> Result<Vec<Entry>> {
        self.query_many(
            &format!(
                "SELECT {} FROM entries WHERE account_id = ?
                 ORDER BY id DESC LIMIT ? OFFSET ?",
                ENTRY_COLUMNS
            ),
            params![account_id, limit, offset],
            row_to_entry,
        )
    }

    fn entries_for_transfer(&self, transfer_id: i64) -> Result<Vec<Entry>> {
        self.query_many(
            &format!(
                "SELECT {} FROM entries WHERE transfer_id = ? ORDER BY amount, id",
                ENTRY_COLUMNS
            ),
            params![transfer_id],
            row_to_entry,
        )
    }

    fn create_transfer(&self, params: &CreateTransferParams) -> Result<Transfer> {
        self.query_one(
            &format!(
                "INSERT INTO transfers (from_account_id, to_account_id, amount, created_at)
                 VALUES (?, ?, ?, ?) RETURNING {}",
                TRANSFER_COLUMNS
            ),
            params![
                params.from_account_id,
                params.to_account_id,
                params.amount,
                now_timestamp()
            ],
            "transfer",
            row_to_transfer,
        )
    }

    fn get_transfer(&self, id: i64) -> Result<Transfer> {
        self.query_one(
            &format!("SELECT {} FROM transfers WHERE id = ?", TRANSFER_COLUMNS),
            params![id],
            &format!("transfer {}", id),
            row_to_transfer,
        )
    }

    fn list_transfers(
        &self,
        account_a: i64,
        account_b: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transfer>> {
        self.query_many(
            &format!(
                "SELECT {} FROM transfers
                 WHERE (from_account_id = ? AND to_account_id = ?)
                    OR (from_account_id = ? AND to_account_id = ?)
                 ORDER BY id DESC LIMIT ? OFFSET ?",
                TRANSFER_COLUMNS
            ),
            params![account_a, account_b, account_b, account_a, limit, offset],
            row_to_transfer,
        )
    }
}

fn not_found_or_database(err: duckdb::Error, what: &str) -> Error {
    match err {
        duckdb::Error::QueryReturnedNoRows => Error::not_found(what.to_string()),
        other => Error::database(format!("{}: {}", what, other)),
    }
}

fn row_to_account(row: &Row<'_>) -> duckdb::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        owner: row.get(1)?,
        balance: row.get(2)?,
        currency: row.get(3)?,
        created_at: created_at(row, 4)?,
    })
}

fn row_to_entry(row: &Row<'_>) -> duckdb::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        account_id: row.get(1)?,
        transfer_id: row.get(2)?,
        amount: row.get(3)?,
        created_at: created_at(row, 4)?,
    })
}

fn row_to_transfer(row: &Row<'_>) -> duckdb::Result<Transfer> {
    Ok(Transfer {
        id: row.get(0)?,
        from_account_id: row.get(1)?,
        to_account_id: row.get(2)?,
        amount: row.get(3)?,
        created_at: created_at(row, 4)?,
    })
}

fn now_timestamp() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

/// Read a `created_at::VARCHAR` column, failing the row when it does not parse
fn created_at(row: &Row<'_>, idx: usize) -> duckdb::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a TIMESTAMP rendered as VARCHAR (UTC, optional fractional seconds)
fn parse_timestamp(s: &str) -> chrono::ParseResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").map(|naive| naive.and_utc())
}
