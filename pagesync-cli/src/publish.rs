//! `publish` command: rebuild the published table from staged rows.

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use pagesync_core::{BaseUrl, TableName, WikitextCleaner};
use pagesync_data::{PublishRequest, Publisher, StoreConfig, TableRole};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_BASE_URL, ARG_DATABASE, ARG_SOURCE_TABLE, ARG_TARGET_TABLE, ARG_USER, CliError,
    ENV_PUBLISH_BASE_URL, ENV_PUBLISH_DATABASE, open_audit_sink, resolve_user,
};

/// CLI arguments for the `publish` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "publish",
    about = "Rebuild the published pages from the staging table",
    long_about = "Truncate the target table and refill it from the source \
                 table: titles are humanised, wikitext is rendered to plain \
                 text, the latest summary is attached and a wiki link is \
                 built from the base URL. The outcome is logged and written \
                 to the audit log; a failed run still exits successfully."
)]
#[ortho_config(prefix = "PAGESYNC")]
pub(crate) struct PublishArgs {
    /// Path to the SQLite page store.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Wiki base URL, ending in a slash (e.g. "https://wiki.example/").
    #[arg(long = ARG_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Staging table to read (default: raw_page_data).
    #[arg(long = ARG_SOURCE_TABLE, value_name = "table")]
    #[serde(default)]
    pub(crate) source_table: Option<String>,
    /// Published table to rebuild (default: pages).
    #[arg(long = ARG_TARGET_TABLE, value_name = "table")]
    #[serde(default)]
    pub(crate) target_table: Option<String>,
    /// User recorded in the audit log (defaults to $USER).
    #[arg(long = ARG_USER, value_name = "name")]
    #[serde(default)]
    pub(crate) user: Option<String>,
}

impl PublishArgs {
    pub(crate) fn into_config(self) -> Result<PublishConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PublishConfig::try_from(merged)
    }
}

/// Resolved `publish` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PublishConfig {
    pub(crate) store: StoreConfig,
    pub(crate) base_url: BaseUrl,
    pub(crate) request: PublishRequest,
    pub(crate) user: String,
}

fn parse_table(
    value: Option<&str>,
    field: &'static str,
    default: TableName,
) -> Result<TableName, CliError> {
    value.map_or(Ok(default), |name| {
        name.parse()
            .map_err(|source| CliError::InvalidTable { field, source })
    })
}

impl TryFrom<PublishArgs> for PublishConfig {
    type Error = CliError;

    fn try_from(args: PublishArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_PUBLISH_DATABASE,
        })?;
        let raw_base_url = args.base_url.ok_or(CliError::MissingArgument {
            field: ARG_BASE_URL,
            env: ENV_PUBLISH_BASE_URL,
        })?;
        let base_url = BaseUrl::parse(&raw_base_url).map_err(|source| CliError::InvalidBaseUrl {
            field: ARG_BASE_URL,
            source,
        })?;
        let defaults = PublishRequest::default();
        let request = PublishRequest {
            source: parse_table(
                args.source_table.as_deref(),
                ARG_SOURCE_TABLE,
                defaults.source,
            )?,
            target: parse_table(
                args.target_table.as_deref(),
                ARG_TARGET_TABLE,
                defaults.target,
            )?,
        }
        .check_roles()
        .map_err(|source| CliError::MisplacedTable {
            field: match source.role {
                TableRole::Source => ARG_SOURCE_TABLE,
                TableRole::Target => ARG_TARGET_TABLE,
            },
            source,
        })?;
        Ok(Self {
            store: StoreConfig::new(database),
            base_url,
            request,
            user: resolve_user(args.user),
        })
    }
}

pub(crate) fn run_publish(args: PublishArgs) -> Result<(), CliError> {
    execute_publish(&args.into_config()?);
    Ok(())
}

pub(crate) fn execute_publish(config: &PublishConfig) {
    let audit = open_audit_sink(&config.store);
    let cleaner = WikitextCleaner::new();
    Publisher::new(&config.store, &config.base_url, &cleaner, audit.as_ref())
        .publish(&config.user, config.request);
}
