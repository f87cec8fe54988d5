//! `init` command: create the page store and provision its schema.

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use pagesync_data::{SCHEMA_VERSION, StoreConfig, create_store, initialise_schema};
use serde::{Deserialize, Serialize};

use crate::{ARG_DATABASE, CliError, ENV_INIT_DATABASE};

/// CLI arguments for the `init` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "init",
    about = "Create the page store and its tables",
    long_about = "Create the SQLite page store, including missing parent \
                 directories, and provision the staging, summary, published \
                 and audit tables. Running it against an existing store is \
                 harmless."
)]
#[ortho_config(prefix = "PAGESYNC")]
pub(crate) struct InitArgs {
    /// Path to the SQLite page store.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl InitArgs {
    pub(crate) fn into_config(self) -> Result<InitConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        InitConfig::try_from(merged)
    }
}

/// Resolved `init` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InitConfig {
    pub(crate) store: StoreConfig,
}

impl TryFrom<InitArgs> for InitConfig {
    type Error = CliError;

    fn try_from(args: InitArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_INIT_DATABASE,
        })?;
        Ok(Self {
            store: StoreConfig::new(database),
        })
    }
}

pub(crate) fn run_init(args: InitArgs) -> Result<(), CliError> {
    execute_init(&args.into_config()?)
}

pub(crate) fn execute_init(config: &InitConfig) -> Result<(), CliError> {
    let path = &config.store.database;
    if let Ok(false) = pagesync_fs::is_regular_file(path) {
        return Err(CliError::DatabaseNotFile {
            field: ARG_DATABASE,
            path: path.clone(),
        });
    }
    let mut connection =
        create_store(&config.store).map_err(|source| CliError::CreateStore {
            path: path.clone(),
            source,
        })?;
    initialise_schema(&mut connection).map_err(|source| CliError::InitialiseSchema {
        path: path.clone(),
        source,
    })?;
    info!("page store ready at {path} (schema version {SCHEMA_VERSION})");
    Ok(())
}
