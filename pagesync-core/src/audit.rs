//! Audit trail of pipeline outcomes.
//!
//! Every terminal outcome of a staging or publishing run, successful or not,
//! is recorded once through an [`AuditSink`].

use std::{error::Error as StdError, fmt};

use thiserror::Error;

/// Pipeline operation an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Bulk-loading an export file into the staging table.
    StageExport,
    /// Rebuilding the published table from staged rows.
    PublishPages,
}

impl Operation {
    /// Every operation, in pipeline order.
    pub const ALL: [Self; 2] = [Self::StageExport, Self::PublishPages];

    /// Stable name stored in the audit log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StageExport => "stage_export",
            Self::PublishPages => "publish_pages",
        }
    }

    /// Look up an operation by its stored name.
    ///
    /// ```
    /// use pagesync_core::Operation;
    ///
    /// assert_eq!(Operation::from_name("publish_pages"), Some(Operation::PublishPages));
    /// assert_eq!(Operation::from_name("error"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|operation| operation.as_str() == name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One terminal outcome of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// User who triggered the run.
    pub user: String,
    /// Operation that finished.
    pub operation: Operation,
    /// Human-readable outcome.
    pub message: String,
}

impl AuditEntry {
    /// Construct an entry from borrowed or owned parts.
    pub fn new(user: impl Into<String>, operation: Operation, message: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            operation,
            message: message.into(),
        }
    }
}

/// Errors raised by audit sinks.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The backing store rejected the entry.
    #[error("failed to record audit entry for {operation}: {source}")]
    Write {
        /// Operation whose outcome could not be recorded.
        operation: Operation,
        /// Underlying storage error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// Append-only destination for audit entries.
pub trait AuditSink {
    /// Append `entry` to the audit trail.
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

impl<T: AuditSink + ?Sized> AuditSink for &T {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        (**self).record(entry)
    }
}
