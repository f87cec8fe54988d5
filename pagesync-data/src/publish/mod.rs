//! Publisher: rebuild the published `pages` table from staged rows.
//!
//! A run truncates the target, then writes one cleaned, linked and
//! summarised row per staged page. The truncate, the reads and every insert
//! share one transaction: either the target ends up fully rebuilt or, on any
//! error, it keeps the rows it had before the run. An empty staging table is
//! the one exception; the truncation is committed and the target is left
//! empty.
#![forbid(unsafe_code)]

use std::{collections::HashSet, fmt};

use log::{error, info, warn};
use pagesync_core::{
    AuditEntry, AuditSink, BaseUrl, BaseUrlError, BaseUrlResolver, EncodingError, Operation,
    PublishedPage, StagedPage, TableName, TextCleaner,
};
use rusqlite::{Error as SqliteError, OptionalExtension, Transaction, params};
use thiserror::Error;

use crate::audit::record_outcome;
use crate::store::{BulkLoad, StoreConfig, StoreError, open_store, raw_field, table_exists};

const LATEST_SUMMARY: &str = "SELECT sum_text FROM summaries
    WHERE page_id = ?1
    ORDER BY sum_update_time DESC
    LIMIT 1";

/// Which side of a publish run a table plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    /// Table staged rows are read from.
    Source,
    /// Table published rows are written to.
    Target,
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "Source",
            Self::Target => "Target",
        })
    }
}

impl TableRole {
    /// Whether `table` has the columns this role reads or writes.
    ///
    /// # Examples
    /// ```
    /// use pagesync_core::TableName;
    /// use pagesync_data::TableRole;
    ///
    /// assert!(TableRole::Source.accepts(TableName::RawPageData));
    /// assert!(!TableRole::Source.accepts(TableName::Pages));
    /// ```
    #[must_use]
    pub const fn accepts(self, table: TableName) -> bool {
        matches!(
            (self, table),
            (Self::Source, TableName::RawPageData) | (Self::Target, TableName::Pages)
        )
    }
}

/// Raised when a permitted table is named for the wrong side of a run.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{role} table cannot be '{table}'")]
pub struct TableRoleError {
    /// Side the table was named for.
    pub role: TableRole,
    /// The misplaced table.
    pub table: TableName,
}

/// Tables a publish run reads from and writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishRequest {
    /// Staging table.
    pub source: TableName,
    /// Published table.
    pub target: TableName,
}

impl PublishRequest {
    /// Check that each table suits the side it was named for.
    pub fn check_roles(self) -> Result<Self, TableRoleError> {
        for (role, table) in [(TableRole::Source, self.source), (TableRole::Target, self.target)] {
            if !role.accepts(table) {
                return Err(TableRoleError { role, table });
            }
        }
        Ok(self)
    }
}

impl Default for PublishRequest {
    fn default() -> Self {
        Self {
            source: TableName::RawPageData,
            target: TableName::Pages,
        }
    }
}

/// Outcome of a publish run that reached the target table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Staging table that was read.
    pub source: TableName,
    /// Published table that was rebuilt.
    pub target: TableName,
    /// Staged rows read.
    pub rows_read: usize,
    /// Distinct pages written.
    pub pages_published: usize,
}

impl PublishReport {
    /// Whether the staging table held no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows_read == 0
    }
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "No data found in table {}", self.source)
        } else {
            write!(
                f,
                "Data copied and sanitised from {} to {} ({} pages)",
                self.source, self.target, self.pages_published
            )
        }
    }
}

/// Reasons a publish run fails.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The store could not be reached.
    #[error("failed to connect to the page store: {0}")]
    Connect(#[source] StoreError),
    /// Source and target name the same table.
    #[error("source and target must differ, both are '{table}'")]
    SameTable { table: TableName },
    /// A table was named for the wrong side of the run.
    #[error("{0}")]
    TableRole(#[source] TableRoleError),
    /// A required table is absent.
    #[error("{role} table '{table}' does not exist.")]
    MissingTable { role: TableRole, table: TableName },
    /// Inspecting the store catalogue failed.
    #[error("failed to inspect the page store: {0}")]
    Catalogue(#[source] StoreError),
    /// The base URL could not be resolved.
    #[error("failed to resolve the wiki base URL: {0}")]
    BaseUrl(#[source] BaseUrlError),
    /// A staged payload is not valid UTF-8.
    #[error("{0}")]
    Encoding(#[source] EncodingError),
    /// A statement inside the publish transaction failed.
    #[error("failed to {operation}: {source}")]
    Sqlite {
        operation: &'static str,
        #[source]
        source: SqliteError,
    },
}

fn sqlite_error(operation: &'static str) -> impl FnOnce(SqliteError) -> PublishError {
    move |source| PublishError::Sqlite { operation, source }
}

/// Rebuilds the published table from the staging table.
///
/// # Examples
/// ```no_run
/// use pagesync_core::{BaseUrl, WikitextCleaner};
/// use pagesync_data::{LogAuditSink, PublishRequest, Publisher, StoreConfig};
///
/// let store = StoreConfig::new("pages.db");
/// let base_url = BaseUrl::new("https://wiki.example/");
/// let cleaner = WikitextCleaner::new();
/// let publisher = Publisher::new(&store, &base_url, &cleaner, &LogAuditSink);
/// publisher.publish("alice", PublishRequest::default());
/// ```
pub struct Publisher<'a> {
    store: &'a StoreConfig,
    base_url: &'a dyn BaseUrlResolver,
    cleaner: &'a dyn TextCleaner,
    audit: &'a dyn AuditSink,
}

impl<'a> Publisher<'a> {
    /// Build a publisher from its collaborators.
    pub fn new(
        store: &'a StoreConfig,
        base_url: &'a dyn BaseUrlResolver,
        cleaner: &'a dyn TextCleaner,
        audit: &'a dyn AuditSink,
    ) -> Self {
        Self {
            store,
            base_url,
            cleaner,
            audit,
        }
    }

    /// Rebuild `request.target` from `request.source` on behalf of `user`.
    ///
    /// Every outcome is logged and recorded in the audit log; nothing is
    /// returned to the caller.
    pub fn publish(&self, user: &str, request: PublishRequest) {
        let message = match self.try_publish(request) {
            Ok(report) if report.is_empty() => {
                warn!("{report}");
                report.to_string()
            }
            Ok(report) => {
                info!("{report}");
                report.to_string()
            }
            Err(err) => {
                error!(
                    "publishing {} to {} failed: {err}",
                    request.source, request.target
                );
                err.to_string()
            }
        };
        record_outcome(
            self.audit,
            &AuditEntry::new(user, Operation::PublishPages, message),
        );
    }

    /// Rebuild `request.target` from `request.source`, returning the outcome
    /// instead of auditing it.
    pub fn try_publish(&self, request: PublishRequest) -> Result<PublishReport, PublishError> {
        let PublishRequest { source, target } = request;
        let mut connection =
            open_store(self.store, BulkLoad::Disabled).map_err(PublishError::Connect)?;
        if source == target {
            return Err(PublishError::SameTable { table: source });
        }
        request.check_roles().map_err(PublishError::TableRole)?;
        for (role, table) in [(TableRole::Source, source), (TableRole::Target, target)] {
            if !table_exists(&connection, table.identifier()).map_err(PublishError::Catalogue)? {
                return Err(PublishError::MissingTable { role, table });
            }
        }
        let base_url = self.base_url.resolve().map_err(PublishError::BaseUrl)?;

        let transaction = connection
            .transaction()
            .map_err(sqlite_error("begin publish transaction"))?;
        transaction
            .execute(&format!("DELETE FROM {target}"), [])
            .map_err(sqlite_error("truncate target table"))?;
        let staged = read_staged(&transaction, source)?;
        let rows_read = staged.len();
        let pages_published = if staged.is_empty() {
            0
        } else {
            write_pages(&transaction, target, staged, &base_url, self.cleaner)?
        };
        transaction
            .commit()
            .map_err(sqlite_error("commit publish transaction"))?;

        Ok(PublishReport {
            source,
            target,
            rows_read,
            pages_published,
        })
    }
}

fn read_staged(
    transaction: &Transaction<'_>,
    source: TableName,
) -> Result<Vec<StagedPage>, PublishError> {
    let mut statement = transaction
        .prepare(&format!(
            "SELECT page_id, page_title, page_text FROM {source}"
        ))
        .map_err(sqlite_error("prepare staging query"))?;
    let rows = statement
        .query_map([], |row| {
            Ok(StagedPage {
                page_id: row.get(0)?,
                title: raw_field(row.get_ref(1)?),
                text: raw_field(row.get_ref(2)?),
            })
        })
        .map_err(sqlite_error("read staged rows"))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(sqlite_error("read staged rows"))
}

/// Insert one published row per staged page, returning the number of
/// distinct page ids written. A later staged row for an id replaces an
/// earlier one.
fn write_pages(
    transaction: &Transaction<'_>,
    target: TableName,
    staged: Vec<StagedPage>,
    base_url: &BaseUrl,
    cleaner: &dyn TextCleaner,
) -> Result<usize, PublishError> {
    let mut summary = transaction
        .prepare_cached(LATEST_SUMMARY)
        .map_err(sqlite_error("prepare summary lookup"))?;
    let mut insert = transaction
        .prepare(&format!(
            "INSERT OR REPLACE INTO {target} (id, title, clean_text, sum_text, link)
             VALUES (?1, ?2, ?3, ?4, ?5)"
        ))
        .map_err(sqlite_error("prepare page insert"))?;

    let mut published = HashSet::new();
    for staged_row in staged {
        let page = staged_row.normalise().map_err(PublishError::Encoding)?;
        let latest: Option<String> = summary
            .query_row([page.page_id], |row| row.get::<_, Option<String>>(0))
            .optional()
            .map_err(sqlite_error("look up latest summary"))?
            .flatten();
        let record = PublishedPage::compose(page, cleaner, base_url, latest);
        insert
            .execute(params![
                record.id,
                record.title,
                record.clean_text,
                record.sum_text,
                record.link
            ])
            .map_err(sqlite_error("insert published page"))?;
        published.insert(record.id);
    }
    Ok(published.len())
}
