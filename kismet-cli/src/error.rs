//! Error types emitted by the Kismet export CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use kismet_core::ExtractError;
use thiserror::Error;

/// Errors emitted by the Kismet export CLI.
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
        /// Flag name without the leading dashes.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// A referenced input path does not exist on disk or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        /// Flag that named the path.
        field: &'static str,
        /// Path as supplied.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag that named the path.
        field: &'static str,
        /// Path as supplied.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// The output names a format the exporter recognises but cannot write.
    #[error("output {output:?} requests {format} output, which is not supported yet")]
    UnsupportedOutputFormat {
        /// Output as supplied.
        output: String,
        /// Recognised format name.
        format: &'static str,
    },
    /// The output is neither `-` nor a path with a known extension.
    #[error("invalid output {output:?}: use \"-\" for stdout or a .csv path")]
    InvalidOutput {
        /// Output as supplied.
        output: String,
    },
    /// Creating or opening the output file failed.
    #[error("failed to open output {path:?}: {source}")]
    OpenOutput {
        /// Output path.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// Reading credentials from the terminal failed.
    #[error("failed to read credentials: {0}")]
    Prompt(#[source] std::io::Error),
    /// Connecting to or reading from Kismet failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// Writing CSV rows failed.
    #[error("failed to write CSV output: {0}")]
    WriteCsv(#[from] csv::Error),
    /// A logger was already installed.
    #[error("failed to initialise logging: {0}")]
    Logging(#[from] log::SetLoggerError),
}
