//! Connection factory for the SQLite page store.
//!
//! The module is split into two focused parts:
//! - this module opens connections from an explicit [`StoreConfig`];
//! - [`schema`] provisions the tables the pipeline reads and writes.
#![forbid(unsafe_code)]

mod schema;

use camino::Utf8PathBuf;
use pagesync_core::RawField;
use rusqlite::{Connection, Error as SqliteError, OpenFlags, OptionalExtension, types::ValueRef};
use thiserror::Error;

pub use schema::{SCHEMA_VERSION, SchemaError, initialise_schema};

/// Location of the page store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database: Utf8PathBuf,
}

impl StoreConfig {
    /// Build a configuration for the database at `database`.
    pub fn new(database: impl Into<Utf8PathBuf>) -> Self {
        Self {
            database: database.into(),
        }
    }
}

/// Whether a connection may ingest local files through the CSV module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkLoad {
    /// Register the CSV virtual-table module on the connection.
    Enabled,
    /// Leave local-file ingestion unavailable.
    Disabled,
}

/// Errors raised while opening or inspecting the page store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Creating the parent directory of a new database failed.
    #[error("failed to create parent directory for {path}: {source}")]
    CreateDirectory {
        /// Database path whose parent could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Enabling SQLite foreign keys failed.
    #[error("failed to enable SQLite foreign keys: {source}")]
    ForeignKeys {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Registering the CSV module failed.
    #[error("failed to enable local bulk loading: {source}")]
    EnableBulkLoad {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A catalogue query failed.
    #[error("failed to {operation}: {source}")]
    Query {
        /// Short description of the failed step.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Open an existing page store.
///
/// The database file must already exist; a missing file is reported as
/// [`StoreError::Open`] rather than silently creating an empty store.
///
/// # Examples
/// ```
/// use pagesync_data::{BulkLoad, StoreConfig, create_store, open_store};
/// use tempfile::TempDir;
///
/// let dir = TempDir::new().expect("create temp dir");
/// let path = dir.path().join("pages.db");
/// let config = StoreConfig::new(path.to_str().expect("utf-8 path"));
/// assert!(open_store(&config, BulkLoad::Disabled).is_err());
///
/// drop(create_store(&config).expect("create store"));
/// let csv = dir.path().join("probe.csv");
/// std::fs::write(&csv, "a,b\n").expect("write probe file");
/// let connection = open_store(&config, BulkLoad::Enabled).expect("open store");
/// connection
///     .execute_batch(&format!(
///         "CREATE VIRTUAL TABLE temp.probe USING csv(filename='{}', header=NO)",
///         csv.display()
///     ))
///     .expect("CSV module available");
/// ```
pub fn open_store(config: &StoreConfig, bulk_load: BulkLoad) -> Result<Connection, StoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection =
        Connection::open_with_flags(config.database.as_std_path(), flags).map_err(|source| {
            StoreError::Open {
                path: config.database.clone(),
                source,
            }
        })?;
    prepare_connection(connection, bulk_load)
}

/// Open the page store, creating the database file and its parent
/// directories when absent.
pub fn create_store(config: &StoreConfig) -> Result<Connection, StoreError> {
    pagesync_fs::ensure_parent_dir(&config.database).map_err(|source| {
        StoreError::CreateDirectory {
            path: config.database.clone(),
            source,
        }
    })?;
    let connection =
        Connection::open(config.database.as_std_path()).map_err(|source| StoreError::Open {
            path: config.database.clone(),
            source,
        })?;
    prepare_connection(connection, BulkLoad::Disabled)
}

fn prepare_connection(
    connection: Connection,
    bulk_load: BulkLoad,
) -> Result<Connection, StoreError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| StoreError::ForeignKeys { source })?;
    if bulk_load == BulkLoad::Enabled {
        rusqlite::vtab::csvtab::load_module(&connection)
            .map_err(|source| StoreError::EnableBulkLoad { source })?;
    }
    Ok(connection)
}

/// Report whether a table called `name` exists in the main schema.
pub fn table_exists(connection: &Connection, name: &str) -> Result<bool, StoreError> {
    connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1",
            [name],
            |_| Ok(()),
        )
        .optional()
        .map(|found| found.is_some())
        .map_err(|source| StoreError::Query {
            operation: "look up table in catalogue",
            source,
        })
}

/// Convert a stored column value into a [`RawField`], keeping byte payloads
/// (and text SQLite holds in a non-UTF-8 encoding) as bytes for explicit
/// decoding later. `NULL` becomes empty text.
pub(crate) fn raw_field(value: ValueRef<'_>) -> RawField {
    match value {
        ValueRef::Null => RawField::Text(String::new()),
        ValueRef::Integer(number) => RawField::Text(number.to_string()),
        ValueRef::Real(number) => RawField::Text(number.to_string()),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => RawField::Text(text.to_owned()),
            Err(_) => RawField::Bytes(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => RawField::Bytes(bytes.to_vec()),
    }
}

/// Render `value` as a single-quoted SQL string literal.
pub(crate) fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
