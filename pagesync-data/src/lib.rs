//! SQLite-backed staging and publishing for exported wiki pages.
//!
//! Responsibilities:
//! - Open the page store with an explicit [`store::StoreConfig`].
//! - Bulk-load the newest export file into `raw_page_data`.
//! - Rebuild the published `pages` table from staged rows.
//! - Record every run outcome in the audit log.
//!
//! Boundaries:
//! - Text cleaning and base-URL resolution are injected through the traits in
//!   `pagesync-core`.
//! - Public entry points never propagate run failures; they log and audit
//!   them. The `try_*` variants return the underlying result for callers that
//!   want it.
//!
//! Invariants:
//! - Only identifiers from [`pagesync_core::TableName`] are interpolated into
//!   SQL text.
//! - No global mutable state.
#![forbid(unsafe_code)]

pub mod audit;
pub mod publish;
pub mod staging;
pub mod store;

pub use audit::{AuditLogError, LogAuditSink, SqliteAuditLog};
pub use publish::{
    PublishError, PublishReport, PublishRequest, Publisher, TableRole, TableRoleError,
};
pub use staging::{
    EXPORT_PREFIX, EXPORT_SUFFIX, ExportFile, StagingError, StagingLoader, StagingReport,
    is_export_file_name, select_latest_export,
};
pub use store::{
    BulkLoad, SCHEMA_VERSION, SchemaError, StoreConfig, StoreError, create_store,
    initialise_schema, open_store, table_exists,
};

#[cfg(test)]
mod test_support;
