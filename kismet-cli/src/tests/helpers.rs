//! Test helpers for building Kismet logs and scripting credential prompts.

use super::*;
use crate::prompt::CredentialPrompt;
use camino::Utf8PathBuf;
use rusqlite::{Connection, params};
use std::{collections::VecDeque, io};
use tempfile::TempDir;

/// Filter selecting every column of [`KismetLog`]'s table.
pub(super) const LOG_FILTER: &str =
    "devices/avg_lat devices/avg_lon devices/devmac devices/channel";

/// Answers prompts from a script and records the labels shown.
#[derive(Debug, Default)]
pub(super) struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub(super) asked: Vec<String>,
}

impl ScriptedPrompt {
    pub(super) fn answering(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|answer| (*answer).to_owned()).collect(),
            asked: Vec::new(),
        }
    }
}

impl CredentialPrompt for ScriptedPrompt {
    fn ask(&mut self, label: &str) -> io::Result<String> {
        self.asked.push(label.to_owned());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}

/// A Kismet SQLite log in a temporary directory.
#[derive(Debug)]
pub(super) struct KismetLog {
    dir: TempDir,
}

impl KismetLog {
    /// Create a log with `count` devices; `fractional` names a device whose
    /// channel is stored as a real number.
    pub(super) fn with_devices(count: i64, fractional: Option<i64>) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let log = Self { dir };
        let connection = Connection::open(log.path()).expect("create log");
        connection
            .execute_batch(
                "CREATE TABLE devices (avg_lat INT, avg_lon INT, devmac TEXT, channel INT)",
            )
            .expect("create table");
        for device in 1..=count {
            let channel = if Some(device) == fractional { 2.5 } else { 6.0 };
            connection
                .execute(
                    "INSERT INTO devices (avg_lat, avg_lon, devmac, channel) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![device * 100_000, -device * 100_000, format!("dev-{device}"), channel],
                )
                .expect("insert device");
        }
        connection.close().expect("close log");
        log
    }

    pub(super) fn path(&self) -> Utf8PathBuf {
        self.resolve("survey.kismet")
    }

    /// Path of `relative` inside the log's directory.
    pub(super) fn resolve(&self, relative: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(relative)).expect("UTF-8 temp path")
    }
}

/// Parse an `export` invocation and resolve its configuration.
pub(super) fn configure(args: &[&str]) -> Result<export::ExportConfig, CliError> {
    let invocation = ["kismet-extract", "export"].iter().chain(args).copied();
    let cli = Cli::try_parse_from(invocation).map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Export(export_args) => resolve_export_config(export_args),
    }
}

/// Run an `export` invocation, capturing stdout.
pub(super) fn export_with_args(args: &[&str]) -> (Result<ExportSummary, CliError>, String) {
    let mut stdout = Vec::new();
    let outcome = configure(args).and_then(|config| {
        run_export_with(&config, &mut ScriptedPrompt::default(), &mut stdout)
    });
    (
        outcome,
        String::from_utf8(stdout).expect("stdout should be UTF-8"),
    )
}
