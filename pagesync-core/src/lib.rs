//! Core domain types for the page synchronisation pipeline.
//!
//! These models keep the staging and publishing stages honest: raw staged
//! fields carry their encoding explicitly, table identifiers come from a
//! closed allow-list, and the text cleaning and base-URL collaborators sit
//! behind traits so the data layer can be exercised with deterministic
//! stand-ins.
#![forbid(unsafe_code)]

pub mod audit;
pub mod link;
pub mod page;
pub mod table;
pub mod text;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use audit::{AuditEntry, AuditError, AuditSink, Operation};
pub use link::{BaseUrl, BaseUrlError, BaseUrlResolver, page_link};
pub use page::{
    EncodingError, NormalisedPage, PageField, PageTitle, PublishedPage, RawField, StagedPage,
    normalise_title,
};
pub use table::{TableName, UnknownTableError};
pub use text::{TextCleaner, WikitextCleaner};
