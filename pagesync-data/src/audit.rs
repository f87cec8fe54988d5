//! Persistent audit trail stored beside the page tables.

use camino::{Utf8Path, Utf8PathBuf};
use log::{error, info};
use pagesync_core::{AuditEntry, AuditError, AuditSink, Operation};
use rusqlite::{Connection, Error as SqliteError, params};
use thiserror::Error;

use crate::store::{BulkLoad, StoreConfig, StoreError, open_store};

pub(crate) const AUDIT_LOG_DDL: &str = "CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user TEXT NOT NULL,
    operation TEXT NOT NULL,
    message TEXT NOT NULL,
    recorded_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
)";

/// Errors raised while opening or reading the audit log.
#[derive(Debug, Error)]
pub enum AuditLogError {
    /// The backing store could not be opened.
    #[error("failed to open audit log: {0}")]
    Open(#[source] StoreError),
    /// Creating the `audit_log` table failed.
    #[error("failed to initialise audit log at {path}: {source}")]
    Initialise {
        path: Utf8PathBuf,
        #[source]
        source: SqliteError,
    },
    /// Reading entries back failed.
    #[error("failed to read audit log: {source}")]
    Read {
        #[source]
        source: SqliteError,
    },
    /// A stored row names an operation this build does not know.
    #[error("audit log holds unknown operation {name:?}")]
    UnknownOperation { name: String },
}

/// [`AuditSink`] writing to the `audit_log` table of the page store.
#[derive(Debug)]
pub struct SqliteAuditLog {
    connection: Connection,
    location: Utf8PathBuf,
}

impl SqliteAuditLog {
    /// Open the audit log in an existing page store, creating the
    /// `audit_log` table when absent.
    pub fn open(config: &StoreConfig) -> Result<Self, AuditLogError> {
        let connection = open_store(config, BulkLoad::Disabled).map_err(AuditLogError::Open)?;
        connection
            .execute(AUDIT_LOG_DDL, [])
            .map_err(|source| AuditLogError::Initialise {
                path: config.database.clone(),
                source,
            })?;
        Ok(Self {
            connection,
            location: config.database.clone(),
        })
    }

    /// Entries in the order they were recorded.
    pub fn entries(&self) -> Result<Vec<AuditEntry>, AuditLogError> {
        let mut statement = self
            .connection
            .prepare("SELECT user, operation, message FROM audit_log ORDER BY id")
            .map_err(|source| AuditLogError::Read { source })?;
        let rows = statement
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|source| AuditLogError::Read { source })?;

        let mut entries = Vec::new();
        for row in rows {
            let (user, name, message) = row.map_err(|source| AuditLogError::Read { source })?;
            let operation = Operation::from_name(&name)
                .ok_or_else(|| AuditLogError::UnknownOperation { name: name.clone() })?;
            entries.push(AuditEntry::new(user, operation, message));
        }
        Ok(entries)
    }

    /// Location of the underlying SQLite database.
    pub fn path(&self) -> &Utf8Path {
        &self.location
    }
}

impl AuditSink for SqliteAuditLog {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.connection
            .execute(
                "INSERT INTO audit_log (user, operation, message) VALUES (?1, ?2, ?3)",
                params![entry.user, entry.operation.as_str(), entry.message],
            )
            .map(|_| ())
            .map_err(|source| AuditError::Write {
                operation: entry.operation,
                source: Box::new(source),
            })
    }
}

/// [`AuditSink`] that forwards entries to the `log` facade.
///
/// Used when the page store itself is unreachable, so the outcome still
/// lands somewhere durable.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        info!(
            target: "pagesync::audit",
            "user={} operation={} message={}",
            entry.user,
            entry.operation,
            entry.message
        );
        Ok(())
    }
}

/// Record `entry`, logging rather than propagating a sink failure.
pub(crate) fn record_outcome(sink: &dyn AuditSink, entry: &AuditEntry) {
    if let Err(err) = sink.record(entry) {
        error!("{err}");
    }
}

#[cfg(test)]
mod tests {
    use pagesync_core::test_support::RejectingAuditLog;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::test_support::ScratchStore;

    #[fixture]
    fn store() -> ScratchStore {
        ScratchStore::provisioned()
    }

    #[rstest]
    fn records_entries_in_order(store: ScratchStore) {
        let log = SqliteAuditLog::open(&store.config).expect("open audit log");
        log.record(&AuditEntry::new("alice", Operation::StageExport, "first"))
            .expect("record first");
        log.record(&AuditEntry::new("bob", Operation::PublishPages, "second"))
            .expect("record second");

        let entries = log.entries().expect("read entries");
        assert_eq!(
            entries,
            vec![
                AuditEntry::new("alice", Operation::StageExport, "first"),
                AuditEntry::new("bob", Operation::PublishPages, "second"),
            ]
        );
        assert_eq!(log.path(), store.config.database.as_path());
    }

    #[rstest]
    fn stamps_each_entry_with_a_time(store: ScratchStore) {
        let log = SqliteAuditLog::open(&store.config).expect("open audit log");
        log.record(&AuditEntry::new("alice", Operation::StageExport, "done"))
            .expect("record entry");

        let recorded_at: String = store
            .connection()
            .query_row("SELECT recorded_at FROM audit_log", [], |row| row.get(0))
            .expect("read timestamp");
        assert!(recorded_at.ends_with('Z'), "unexpected timestamp {recorded_at}");
    }

    #[rstest]
    fn creates_the_table_in_a_bare_store() {
        let store = ScratchStore::empty();
        let log = SqliteAuditLog::open(&store.config).expect("open audit log");
        assert!(log.entries().expect("read entries").is_empty());
    }

    #[rstest]
    fn refuses_a_missing_database() {
        let store = ScratchStore::missing();
        let err = SqliteAuditLog::open(&store.config).expect_err("database is absent");
        assert!(matches!(err, AuditLogError::Open(StoreError::Open { .. })));
    }

    #[rstest]
    fn rejects_unknown_operations(store: ScratchStore) {
        store
            .connection()
            .execute(
                "INSERT INTO audit_log (user, operation, message) VALUES ('x', 'error', 'm')",
                [],
            )
            .expect("seed foreign row");
        let log = SqliteAuditLog::open(&store.config).expect("open audit log");
        let err = log.entries().expect_err("unknown operation");
        assert!(matches!(err, AuditLogError::UnknownOperation { name } if name == "error"));
    }

    #[rstest]
    fn sink_failures_are_swallowed() {
        record_outcome(
            &RejectingAuditLog,
            &AuditEntry::new("alice", Operation::PublishPages, "ignored"),
        );
    }
}
