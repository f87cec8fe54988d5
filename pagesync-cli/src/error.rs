//! Error types emitted by the pagesync CLI.
//!
//! Staging and publishing failures never reach this type: those runs log and
//! audit their own outcomes. Only problems that stop a command from starting
//! are reported here.

use std::sync::Arc;

use camino::Utf8PathBuf;
use pagesync_core::{BaseUrlError, UnknownTableError};
use pagesync_data::{SchemaError, StoreError, TableRoleError};
use thiserror::Error;

/// Errors emitted by the pagesync CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A table option named a table outside the allow-list.
    #[error("invalid --{field}: {source}")]
    InvalidTable {
        field: &'static str,
        #[source]
        source: UnknownTableError,
    },
    /// A table option named a permitted table for the wrong side of the run.
    #[error("invalid --{field}: {source}")]
    MisplacedTable {
        field: &'static str,
        #[source]
        source: TableRoleError,
    },
    /// The base URL option could not be parsed.
    #[error("invalid --{field}: {source}")]
    InvalidBaseUrl {
        field: &'static str,
        #[source]
        source: BaseUrlError,
    },
    /// The database path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    DatabaseNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// Creating the page store failed.
    #[error("failed to create page store at {path:?}: {source}")]
    CreateStore {
        path: Utf8PathBuf,
        #[source]
        source: StoreError,
    },
    /// Provisioning the page-store schema failed.
    #[error("failed to initialise schema in {path:?}: {source}")]
    InitialiseSchema {
        path: Utf8PathBuf,
        #[source]
        source: SchemaError,
    },
}
