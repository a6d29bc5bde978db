//! Log database migrations - embedded SQL files
//!
//! Kept separate from the ledger migrations: the event log lives in its own
//! database file so it can be exported or cleared without touching the ledger.

/// All log migrations, embedded at compile time.
/// Format: (filename, sql_content)
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
