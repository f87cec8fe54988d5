//! Test-only collaborators used by unit and behaviour tests.

use std::cell::RefCell;

use crate::{
    AuditEntry, AuditError, AuditSink, BaseUrl, BaseUrlError, BaseUrlResolver, Operation,
    TextCleaner,
};

/// In-memory [`AuditSink`] that keeps every recorded entry.
#[derive(Debug, Default)]
pub struct RecordingAuditLog {
    entries: RefCell<Vec<AuditEntry>>,
}

impl RecordingAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the entries recorded so far.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.borrow().clone()
    }

    /// Entries recorded for `operation`.
    pub fn entries_for(&self, operation: Operation) -> Vec<AuditEntry> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.operation == operation)
            .cloned()
            .collect()
    }
}

impl AuditSink for RecordingAuditLog {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries.borrow_mut().push(entry.clone());
        Ok(())
    }
}

/// [`AuditSink`] that rejects every entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectingAuditLog;

impl AuditSink for RejectingAuditLog {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        Err(AuditError::Write {
            operation: entry.operation,
            source: "audit store offline".into(),
        })
    }
}

/// [`TextCleaner`] that tags each stage so tests can assert ordering.
///
/// Rendering wraps the input in `rendered(...)` and normalisation wraps it in
/// `normalised(...)`, so `clean("x")` yields `normalised(rendered(x))`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerCleaner;

impl TextCleaner for MarkerCleaner {
    fn render_wikitext(&self, raw: &str) -> String {
        format!("rendered({raw})")
    }

    fn normalise_database_text(&self, rendered: &str) -> String {
        format!("normalised({rendered})")
    }
}

/// [`BaseUrlResolver`] that always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBaseUrl;

impl BaseUrlResolver for UnavailableBaseUrl {
    fn resolve(&self) -> Result<BaseUrl, BaseUrlError> {
        Err(BaseUrlError::Unavailable {
            message: "no base URL configured".to_owned(),
        })
    }
}
