//! Facade crate for the page staging and publishing pipeline.
//!
//! This crate re-exports the domain types from `pagesync-core` and the
//! SQLite-backed staging loader and publisher from `pagesync-data`.

#![forbid(unsafe_code)]

pub use pagesync_core::{
    AuditEntry, AuditError, AuditSink, BaseUrl, BaseUrlError, BaseUrlResolver, EncodingError,
    Operation, PageTitle, PublishedPage, RawField, StagedPage, TableName, TextCleaner,
    UnknownTableError, WikitextCleaner, normalise_title, page_link,
};

pub use pagesync_data::{
    BulkLoad, LogAuditSink, PublishError, PublishReport, PublishRequest, Publisher,
    SqliteAuditLog, StagingError, StagingLoader, StagingReport, StoreConfig, StoreError,
    TableRole, TableRoleError, initialise_schema, open_store,
};

#[cfg(feature = "test-support")]
pub use pagesync_core::test_support;
