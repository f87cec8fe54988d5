//! Staging loader: bulk-load the newest export into `raw_page_data`.
//!
//! Each run selects one export by creation time, appends its rows to the
//! staging table with a shared `import_time`, and records the outcome in the
//! audit log. Nothing is deduplicated; repeated runs append again.
#![forbid(unsafe_code)]

mod export;

use std::{fmt, io};

use camino::{Utf8Path, Utf8PathBuf};
use log::{error, info};
use pagesync_core::{AuditEntry, AuditSink, Operation, TableName};
use rusqlite::{Connection, Error as SqliteError};
use thiserror::Error;

use crate::audit::record_outcome;
use crate::store::{BulkLoad, StoreConfig, StoreError, open_store, sql_literal, table_exists};

pub use export::{
    EXPORT_PREFIX, EXPORT_SUFFIX, ExportFile, is_export_file_name, select_latest_export,
};

/// The CSV module splits arguments on `=` and does not unescape `''`.
const UNSUPPORTED_PATH_CHARS: [char; 2] = ['\'', '='];
const EXPORT_VTAB: &str = "temp.page_export";
const EXPORT_COLUMNS: &str = "CREATE TABLE x(page_id, page_title, page_text, export_time)";
const INSERT_STAGED: &str = "INSERT INTO raw_page_data
        (page_id, page_title, page_text, export_time, import_time)
    SELECT page_id, page_title, page_text, export_time,
        strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
    FROM temp.page_export";

/// Summary of a successful staging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingReport {
    /// Export that was loaded.
    pub export: Utf8PathBuf,
    /// Number of data rows appended to `raw_page_data`.
    pub rows_loaded: usize,
}

impl fmt::Display for StagingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Data from {} imported successfully ({} rows)",
            self.export, self.rows_loaded
        )
    }
}

/// Reasons a staging run ends without loading data.
#[derive(Debug, Error)]
pub enum StagingError {
    /// The store could not be reached.
    #[error("failed to connect to the page store: {0}")]
    Connect(#[source] StoreError),
    /// The staging table is absent.
    #[error("Table '{table}' does not exist.")]
    MissingTable { table: TableName },
    /// Inspecting the store catalogue failed.
    #[error("failed to inspect the page store: {0}")]
    Catalogue(#[source] StoreError),
    /// The export directory could not be listed.
    #[error("failed to read export directory {directory}: {source}")]
    ReadDirectory {
        directory: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// No file in the directory matches the export pattern.
    #[error("No CSV file found in the directory {directory}")]
    NoExportFound { directory: Utf8PathBuf },
    /// The CSV module's argument parser cannot address this path.
    #[error("export path {path} contains {character:?} and cannot be bulk-loaded")]
    UnsupportedPath { path: Utf8PathBuf, character: char },
    /// The bulk load itself failed; nothing was committed.
    #[error("failed to {operation} for {path}: {source}")]
    Load {
        operation: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: SqliteError,
    },
}

/// Loads export files into the staging table.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use pagesync_data::{LogAuditSink, StagingLoader, StoreConfig};
///
/// let store = StoreConfig::new("pages.db");
/// let loader = StagingLoader::new(&store, &LogAuditSink);
/// loader.load("alice", Utf8Path::new("exports"));
/// ```
pub struct StagingLoader<'a> {
    store: &'a StoreConfig,
    audit: &'a dyn AuditSink,
}

impl<'a> StagingLoader<'a> {
    /// Build a loader writing to `store` and auditing through `audit`.
    pub fn new(store: &'a StoreConfig, audit: &'a dyn AuditSink) -> Self {
        Self { store, audit }
    }

    /// Stage the newest export in `directory` on behalf of `user`.
    ///
    /// Every outcome is logged and recorded in the audit log; nothing is
    /// returned to the caller.
    pub fn load(&self, user: &str, directory: &Utf8Path) {
        let message = match self.try_load(directory) {
            Ok(report) => {
                info!("{report}");
                report.to_string()
            }
            Err(err) => {
                error!("staging {directory} failed: {err}");
                err.to_string()
            }
        };
        record_outcome(
            self.audit,
            &AuditEntry::new(user, Operation::StageExport, message),
        );
    }

    /// Stage the newest export in `directory`, returning the outcome instead
    /// of auditing it.
    pub fn try_load(&self, directory: &Utf8Path) -> Result<StagingReport, StagingError> {
        let mut connection =
            open_store(self.store, BulkLoad::Enabled).map_err(StagingError::Connect)?;

        let table = TableName::RawPageData;
        if !table_exists(&connection, table.identifier()).map_err(StagingError::Catalogue)? {
            return Err(StagingError::MissingTable { table });
        }

        let export = select_latest_export(directory)
            .map_err(|source| StagingError::ReadDirectory {
                directory: directory.to_path_buf(),
                source,
            })?
            .ok_or_else(|| StagingError::NoExportFound {
                directory: directory.to_path_buf(),
            })?;
        if let Some(character) = export
            .path
            .as_str()
            .chars()
            .find(|c| UNSUPPORTED_PATH_CHARS.contains(c))
        {
            return Err(StagingError::UnsupportedPath {
                path: export.path,
                character,
            });
        }

        let rows_loaded = bulk_load(&mut connection, &export.path)?;
        Ok(StagingReport {
            export: export.path,
            rows_loaded,
        })
    }
}

/// Append every data row of `export` to `raw_page_data` in one transaction.
///
/// The header row is skipped. Fields may be double-quoted with `""` escaping
/// and may contain commas or newlines.
fn bulk_load(connection: &mut Connection, export: &Utf8Path) -> Result<usize, StagingError> {
    let load_error = |operation: &'static str| {
        move |source: SqliteError| StagingError::Load {
            operation,
            path: export.to_path_buf(),
            source,
        }
    };

    let transaction = connection
        .transaction()
        .map_err(load_error("begin staging transaction"))?;
    transaction
        .execute_batch(&format!(
            "CREATE VIRTUAL TABLE {EXPORT_VTAB} USING csv(filename={}, header=YES, schema={})",
            sql_literal(export.as_str()),
            sql_literal(EXPORT_COLUMNS)
        ))
        .map_err(load_error("open export"))?;
    let rows = transaction
        .execute(INSERT_STAGED, [])
        .map_err(load_error("copy export rows"))?;
    transaction
        .execute_batch(&format!("DROP TABLE {EXPORT_VTAB}"))
        .map_err(load_error("close export"))?;
    transaction
        .commit()
        .map_err(load_error("commit staging transaction"))?;
    Ok(rows)
}
