//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use pagesync_cli::CliError;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    match pagesync_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("pagesync: {err}");
            std::process::exit(1);
        }
    }
}
