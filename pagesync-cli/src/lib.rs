//! Command-line interface for the page staging and publishing pipeline.
#![forbid(unsafe_code)]

mod error;
mod init;
mod publish;
mod stage;

use clap::{Parser, Subcommand};
use log::warn;
use pagesync_core::AuditSink;
use pagesync_data::{LogAuditSink, SqliteAuditLog, StoreConfig};

pub use error::CliError;

use init::InitArgs;
use publish::PublishArgs;
use stage::StageArgs;

const ARG_DATABASE: &str = "database";
const ARG_DIRECTORY: &str = "directory";
const ARG_BASE_URL: &str = "base-url";
const ARG_SOURCE_TABLE: &str = "source-table";
const ARG_TARGET_TABLE: &str = "target-table";
const ARG_USER: &str = "user";
const ENV_INIT_DATABASE: &str = "PAGESYNC_CMDS_INIT_DATABASE";
const ENV_STAGE_DATABASE: &str = "PAGESYNC_CMDS_STAGE_DATABASE";
const ENV_STAGE_DIRECTORY: &str = "PAGESYNC_CMDS_STAGE_DIRECTORY";
const ENV_PUBLISH_DATABASE: &str = "PAGESYNC_CMDS_PUBLISH_DATABASE";
const ENV_PUBLISH_BASE_URL: &str = "PAGESYNC_CMDS_PUBLISH_BASE_URL";
const DEFAULT_USER: &str = "pagesync";

/// Run the pagesync CLI with the current process arguments and environment.
///
/// `stage` and `publish` return `Ok(())` once their outcome has been logged
/// and audited, whether or not the run itself succeeded.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    dispatch(cli.command)
}

fn dispatch(command: Command) -> Result<(), CliError> {
    match command {
        Command::Init(args) => init::run_init(args),
        Command::Stage(args) => stage::run_stage(args),
        Command::Publish(args) => publish::run_publish(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "pagesync",
    about = "Stage wiki page exports and publish cleaned pages",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the page store and its tables.
    Init(InitArgs),
    /// Bulk-load the newest export file into the staging table.
    Stage(StageArgs),
    /// Rebuild the published pages from the staging table.
    Publish(PublishArgs),
}

/// Pick the user recorded in the audit log: the explicit option, then the
/// `USER` environment variable, then a fixed fallback.
fn resolve_user(explicit: Option<String>) -> String {
    explicit
        .filter(|user| !user.trim().is_empty())
        .or_else(|| {
            std::env::var("USER")
                .ok()
                .filter(|user| !user.trim().is_empty())
        })
        .unwrap_or_else(|| DEFAULT_USER.to_owned())
}

/// Audit into the page store when it can be opened, otherwise into the
/// process log.
fn open_audit_sink(store: &StoreConfig) -> Box<dyn AuditSink> {
    match SqliteAuditLog::open(store) {
        Ok(log) => Box::new(log),
        Err(err) => {
            warn!("audit log unavailable, recording outcomes in the process log: {err}");
            Box::new(LogAuditSink)
        }
    }
}

#[cfg(test)]
mod tests;
