//! `stage` command: load the newest export into the staging table.

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use pagesync_data::{StagingLoader, StoreConfig};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATABASE, ARG_DIRECTORY, ARG_USER, CliError, ENV_STAGE_DATABASE, ENV_STAGE_DIRECTORY,
    open_audit_sink, resolve_user,
};

/// CLI arguments for the `stage` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "stage",
    about = "Bulk-load the newest export into raw_page_data",
    long_about = "Pick the most recently created latest_pages_data_*.csv in \
                 the export directory and append its rows to raw_page_data. \
                 The outcome is logged and written to the audit log; a failed \
                 run still exits successfully."
)]
#[ortho_config(prefix = "PAGESYNC")]
pub(crate) struct StageArgs {
    /// Path to the SQLite page store.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Directory holding export files.
    #[arg(long = ARG_DIRECTORY, value_name = "dir")]
    #[serde(default)]
    pub(crate) directory: Option<Utf8PathBuf>,
    /// User recorded in the audit log (defaults to $USER).
    #[arg(long = ARG_USER, value_name = "name")]
    #[serde(default)]
    pub(crate) user: Option<String>,
}

impl StageArgs {
    pub(crate) fn into_config(self) -> Result<StageConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        StageConfig::try_from(merged)
    }
}

/// Resolved `stage` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StageConfig {
    pub(crate) store: StoreConfig,
    pub(crate) directory: Utf8PathBuf,
    pub(crate) user: String,
}

impl TryFrom<StageArgs> for StageConfig {
    type Error = CliError;

    fn try_from(args: StageArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_STAGE_DATABASE,
        })?;
        let directory = args.directory.ok_or(CliError::MissingArgument {
            field: ARG_DIRECTORY,
            env: ENV_STAGE_DIRECTORY,
        })?;
        Ok(Self {
            store: StoreConfig::new(database),
            directory,
            user: resolve_user(args.user),
        })
    }
}

pub(crate) fn run_stage(args: StageArgs) -> Result<(), CliError> {
    execute_stage(&args.into_config()?);
    Ok(())
}

pub(crate) fn execute_stage(config: &StageConfig) {
    let audit = open_audit_sink(&config.store);
    StagingLoader::new(&config.store, audit.as_ref()).load(&config.user, &config.directory);
}
