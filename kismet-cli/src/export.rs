//! Export command implementation for the Kismet CLI.

use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use kismet_core::{ExtractError, RecordSource, RestFilter, TableFilter};
use kismet_data::rest::parse_base_url;
use kismet_data::{DataSource, DataSourceConfig};
use log::{debug, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::csv_writer::{ExportSummary, write_csv};
use crate::output::{OutputTarget, STDOUT_OUTPUT};
use crate::prompt::{CredentialPrompt, resolve_credentials};
use crate::{ARG_DB_FILE, ARG_FILTER, CliError, ENV_FILTER};

/// Seconds allowed for each HTTP request when no timeout is configured.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI arguments for the `export` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read located devices from a Kismet server or a Kismet \
                 SQLite log and write them as CSV. The filter lists the \
                 latitude, longitude and identifier fields first, followed \
                 by any extra fields to carry through. Values can come from \
                 CLI flags, configuration files, or environment variables.",
    about = "Export located devices as CSV"
)]
#[ortho_config(prefix = "KISMET")]
pub(crate) struct ExportArgs {
    /// Path to a Kismet SQLite log.
    #[arg(long = ARG_DB_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) db_file: Option<Utf8PathBuf>,
    /// Base URL of a Kismet server (e.g. "http://localhost:2501").
    #[arg(long = "rest-url", value_name = "url")]
    #[serde(default)]
    pub(crate) rest_url: Option<String>,
    /// Whitespace-separated fields: latitude, longitude, identifier, extras.
    #[arg(long = ARG_FILTER, value_name = "fields")]
    #[serde(default)]
    pub(crate) filter: Option<String>,
    /// "-" for stdout or a .csv path.
    #[arg(long = "output", short = 'o', value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<String>,
    /// Append to the output file without writing a header row.
    #[arg(long)]
    #[serde(default)]
    pub(crate) append: bool,
    /// Log connection and export progress.
    #[arg(long, short = 'v')]
    #[serde(default)]
    pub(crate) verbose: bool,
    /// Kismet username; prompted for when absent.
    #[arg(long, value_name = "name")]
    #[serde(default)]
    pub(crate) username: Option<String>,
    /// Kismet password; prompted for when absent.
    #[arg(long, value_name = "password")]
    #[serde(default)]
    pub(crate) password: Option<String>,
    /// Timeout for each HTTP request.
    #[arg(long = "timeout-secs", value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl ExportArgs {
    pub(crate) fn into_config(self) -> Result<ExportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ExportConfig::try_from(merged)
    }
}

/// Resolved `export` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExportConfig {
    /// Kismet SQLite log, when reading a file.
    pub(crate) db_file: Option<Utf8PathBuf>,
    /// Kismet server, when reading over HTTP.
    pub(crate) rest_url: Option<String>,
    /// Filter specification.
    pub(crate) filter: String,
    /// Where rows are written.
    pub(crate) output: OutputTarget,
    pub(crate) append: bool,
    pub(crate) verbose: bool,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) timeout: Duration,
}

impl ExportConfig {
    /// Check that a configured log file exists.
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        match &self.db_file {
            Some(path) => Self::require_existing(path, ARG_DB_FILE),
            None => Ok(()),
        }
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match kismet_fs::is_regular_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    const fn reads_rest(&self) -> bool {
        self.rest_url.is_some() && self.db_file.is_none()
    }

    /// Build the data source configuration, asking for missing credentials
    /// when reading from a Kismet server.
    pub(crate) fn data_source_config(
        &self,
        prompt: &mut dyn CredentialPrompt,
    ) -> Result<DataSourceConfig, CliError> {
        let mut config = DataSourceConfig::new(self.filter.clone()).with_timeout(self.timeout);
        if let Some(url) = &self.rest_url {
            config = config.with_rest_url(url.clone());
        }
        if let Some(path) = &self.db_file {
            config = config.with_db_file(path.clone().into_std_path_buf());
        }
        if self.reads_rest() {
            let credentials =
                resolve_credentials(self.username.clone(), self.password.clone(), prompt)?;
            config = config.with_credentials(credentials);
        }
        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_owned())
        .filter(|trimmed| !trimmed.is_empty())
}

impl TryFrom<ExportArgs> for ExportConfig {
    type Error = CliError;

    fn try_from(args: ExportArgs) -> Result<Self, Self::Error> {
        let filter = non_empty(args.filter).ok_or(CliError::MissingArgument {
            field: ARG_FILTER,
            env: ENV_FILTER,
        })?;
        let rest_url = non_empty(args.rest_url);
        let db_file = args.db_file.filter(|path| !path.as_str().is_empty());
        match (&rest_url, &db_file) {
            (Some(_), Some(_)) => return Err(ExtractError::AmbiguousBackend.into()),
            (None, None) => return Err(ExtractError::NoBackend.into()),
            (Some(url), None) => {
                parse_base_url(url)?;
                RestFilter::parse(&filter).map_err(ExtractError::from)?;
            }
            (None, Some(_)) => {
                TableFilter::parse(&filter).map_err(ExtractError::from)?;
            }
        }
        let output = OutputTarget::parse(args.output.as_deref().unwrap_or(STDOUT_OUTPUT))?;
        let timeout = Duration::from_secs(args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        Ok(Self {
            db_file,
            rest_url,
            filter,
            output,
            append: args.append,
            verbose: args.verbose,
            username: args.username,
            password: args.password,
            timeout,
        })
    }
}

/// Merge the argument layers and check the configured sources.
pub(crate) fn resolve_export_config(args: ExportArgs) -> Result<ExportConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

/// Connect to the configured backend and stream its records to the output.
pub(crate) fn run_export_with(
    config: &ExportConfig,
    prompt: &mut dyn CredentialPrompt,
    stdout: &mut dyn Write,
) -> Result<ExportSummary, CliError> {
    let source_config = config.data_source_config(prompt)?;
    let mut source = DataSource::open(&source_config)?;
    debug!(
        "exporting to {}",
        config.output.path().map_or("stdout", Utf8Path::as_str)
    );
    let writer = match config.output.open(config.append, stdout) {
        Ok(writer) => writer,
        Err(err) => {
            if let Err(finish) = source.finish() {
                warn!("failed to release Kismet source: {finish}");
            }
            return Err(err);
        }
    };
    write_csv(&mut source, writer, !config.append)
}
