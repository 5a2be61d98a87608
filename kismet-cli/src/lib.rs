//! Command-line interface for exporting located devices from Kismet.
#![forbid(unsafe_code)]

use std::io;

use clap::{Parser, Subcommand};
use log::info;

mod csv_writer;
mod error;
mod export;
mod logging;
mod output;
mod prompt;

pub use csv_writer::{ExportSummary, write_csv};
pub use error::CliError;

use export::{ExportArgs, resolve_export_config, run_export_with};
use prompt::TerminalPrompt;

const ARG_DB_FILE: &str = "db-file";
const ARG_FILTER: &str = "filter";
const ENV_FILTER: &str = "KISMET_CMDS_EXPORT_FILTER";

/// Run the Kismet CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns a [`CliError`] when the arguments are invalid, the backend cannot
/// be read, or the output cannot be written.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Export(args) => {
            let config = resolve_export_config(args)?;
            logging::init_logging(config.verbose)?;
            let mut stdout = io::stdout().lock();
            let summary = run_export_with(&config, &mut TerminalPrompt, &mut stdout)?;
            info!(
                "wrote {} records ({} rows skipped)",
                summary.written, summary.skipped
            );
        }
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "kismet-extract",
    about = "Extract located devices from Kismet servers and logs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write devices from a Kismet server or SQLite log as CSV.
    Export(ExportArgs),
}

#[cfg(test)]
mod tests;
