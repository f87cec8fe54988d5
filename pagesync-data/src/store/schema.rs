#![forbid(unsafe_code)]

use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

use crate::audit::AUDIT_LOG_DDL;

/// Version stamped into `pagesync_schema_version` by [`initialise_schema`].
pub const SCHEMA_VERSION: i64 = 1;

/// Provision the page-store tables inside an existing SQLite database.
///
/// Creates `raw_page_data`, `summaries`, `pages` and `audit_log` when absent,
/// plus the supporting indexes, and records the schema version. Running it
/// again is a no-op; a store stamped with a different version is rejected.
///
/// # Examples
/// ```
/// use pagesync_data::{initialise_schema, table_exists};
/// use rusqlite::Connection;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create page schema");
/// initialise_schema(&mut conn).expect("re-running is harmless");
///
/// for table in ["raw_page_data", "summaries", "pages", "audit_log"] {
///     assert!(table_exists(&conn, table).expect("query catalogue"));
/// }
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_tables(&transaction)?;
    create_indexes(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create raw_page_data",
        "CREATE TABLE IF NOT EXISTS raw_page_data (
            page_id INTEGER NOT NULL,
            page_title TEXT,
            page_text TEXT,
            export_time TEXT,
            import_time TEXT NOT NULL
        )",
    )?;
    run_migration_step(
        transaction,
        "create summaries",
        "CREATE TABLE IF NOT EXISTS summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            page_id INTEGER NOT NULL,
            sum_text TEXT NOT NULL,
            sum_update_time TEXT NOT NULL
        )",
    )?;
    run_migration_step(
        transaction,
        "create pages",
        "CREATE TABLE IF NOT EXISTS pages (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            clean_text TEXT NOT NULL,
            sum_text TEXT NOT NULL DEFAULT '',
            link TEXT NOT NULL
        )",
    )?;
    run_migration_step(transaction, "create audit_log", AUDIT_LOG_DDL)
}

fn create_indexes(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "index summaries",
        "CREATE INDEX IF NOT EXISTS idx_summaries_page_update
            ON summaries(page_id, sum_update_time)",
    )?;
    run_migration_step(
        transaction,
        "index raw_page_data",
        "CREATE INDEX IF NOT EXISTS idx_raw_page_data_page
            ON raw_page_data(page_id)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS pagesync_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM pagesync_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO pagesync_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}

/// Errors raised when provisioning the page-store schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A DDL or version-table statement failed.
    #[error("failed to execute migration step '{step}': {source}")]
    Migration {
        step: &'static str,
        #[source]
        source: SqliteError,
    },
    /// The store was provisioned by a different schema version.
    #[error(
        "expected page store schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch { expected: i64, found: i64 },
}
