//! Focused unit tests covering export configuration and execution.

use super::helpers::{KismetLog, LOG_FILTER, ScriptedPrompt, configure, export_with_args};
use super::*;
use crate::export::{DEFAULT_TIMEOUT_SECS, ExportArgs, ExportConfig};
use crate::output::OutputTarget;
use camino::Utf8PathBuf;
use kismet_core::{ExtractError, FilterError};
use rstest::rstest;
use std::{fs, time::Duration};

fn sqlite_args(output: Option<&str>) -> ExportArgs {
    ExportArgs {
        db_file: Some(Utf8PathBuf::from("survey.kismet")),
        filter: Some(LOG_FILTER.to_owned()),
        output: output.map(str::to_owned),
        ..ExportArgs::default()
    }
}

fn rest_args(username: Option<&str>, password: Option<&str>) -> ExportArgs {
    ExportArgs {
        rest_url: Some("http://localhost:2501".to_owned()),
        filter: Some("a/lat a/lon a/macaddr".to_owned()),
        username: username.map(str::to_owned),
        password: password.map(str::to_owned),
        ..ExportArgs::default()
    }
}

#[rstest]
#[case(None)]
#[case(Some("   "))]
fn converting_without_filter_errors(#[case] filter: Option<&str>) {
    let args = ExportArgs {
        filter: filter.map(str::to_owned),
        ..sqlite_args(None)
    };
    let err = ExportConfig::try_from(args).expect_err("missing filter should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_FILTER);
            assert_eq!(env, ENV_FILTER);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn converting_applies_defaults() {
    let config = ExportConfig::try_from(sqlite_args(None)).expect("valid arguments");
    assert_eq!(config.output, OutputTarget::Stdout);
    assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    assert!(!config.append);
}

#[rstest]
#[case(Some("http://localhost:2501"), Some("survey.kismet"), ExtractError::AmbiguousBackend)]
#[case(None, None, ExtractError::NoBackend)]
#[case(Some(""), None, ExtractError::NoBackend)]
fn converting_requires_exactly_one_backend(
    #[case] rest_url: Option<&str>,
    #[case] db_file: Option<&str>,
    #[case] expected: ExtractError,
) {
    let args = ExportArgs {
        rest_url: rest_url.map(str::to_owned),
        db_file: db_file.map(Utf8PathBuf::from),
        filter: Some(LOG_FILTER.to_owned()),
        ..ExportArgs::default()
    };
    match ExportConfig::try_from(args) {
        Err(CliError::Extract(err)) => assert_eq!(err, expected),
        other => panic!("expected {expected:?}, found {other:?}"),
    }
}

#[rstest]
fn converting_rejects_non_http_urls() {
    let args = ExportArgs {
        rest_url: Some("ftp://localhost:2501".to_owned()),
        ..rest_args(None, None)
    };
    let err = ExportConfig::try_from(args).expect_err("ftp should be rejected");
    assert!(
        matches!(err, CliError::Extract(ExtractError::UnsupportedScheme { .. })),
        "unexpected error {err:?}"
    );
}

#[rstest]
fn short_rest_filter_fails_before_prompting() {
    let args = ExportArgs {
        filter: Some("a/lat a/lon".to_owned()),
        ..rest_args(None, None)
    };
    let mut prompt = ScriptedPrompt::answering(&["kismet", "secret"]);
    let outcome =
        ExportConfig::try_from(args).and_then(|config| config.data_source_config(&mut prompt));
    assert!(
        matches!(
            outcome,
            Err(CliError::Extract(ExtractError::Filter(FilterError::TooFewFields { found: 2 })))
        ),
        "unexpected outcome {outcome:?}"
    );
    assert!(prompt.asked.is_empty());
}

#[rstest]
fn mixed_table_filter_is_rejected_for_logs() {
    let args = ExportArgs {
        filter: Some("devices/avg_lat devices/avg_lon packets/sourcemac".to_owned()),
        ..sqlite_args(None)
    };
    let err = ExportConfig::try_from(args).expect_err("mixed tables should be rejected");
    assert!(
        matches!(
            &err,
            CliError::Extract(ExtractError::Filter(FilterError::TableMismatch { found, .. }))
                if found == "packets"
        ),
        "unexpected error {err:?}"
    );
}

#[rstest]
#[case("-", OutputTarget::Stdout)]
#[case("out/devices.csv", OutputTarget::CsvFile(Utf8PathBuf::from("out/devices.csv")))]
#[case("devices.csv.part", OutputTarget::CsvFile(Utf8PathBuf::from("devices.csv.part")))]
fn output_selects_csv_targets(#[case] output: &str, #[case] expected: OutputTarget) {
    let config = ExportConfig::try_from(sqlite_args(Some(output))).expect("valid output");
    assert_eq!(config.output, expected);
}

#[rstest]
fn kml_output_is_unsupported() {
    let err = ExportConfig::try_from(sqlite_args(Some("devices.kml"))).expect_err("KML");
    match err {
        CliError::UnsupportedOutputFormat { format, .. } => assert_eq!(format, "KML"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[rstest]
fn unknown_output_is_invalid() {
    let err = ExportConfig::try_from(sqlite_args(Some("devices.txt"))).expect_err("txt");
    assert!(
        matches!(err, CliError::InvalidOutput { .. }),
        "unexpected error {err:?}"
    );
}

#[rstest]
fn validate_sources_reports_missing_log() {
    let log = KismetLog::with_devices(0, None);
    let missing = log.resolve("missing.kismet");
    let err = configure(&["--db-file", missing.as_str(), "--filter", LOG_FILTER])
        .expect_err("missing log should fail");
    match err {
        CliError::MissingSourceFile { field, path } => {
            assert_eq!(field, ARG_DB_FILE);
            assert_eq!(path, missing);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[rstest]
fn rest_config_prompts_username_then_password() {
    let config = ExportConfig::try_from(rest_args(None, None)).expect("valid arguments");
    let mut prompt = ScriptedPrompt::answering(&["kismet", "secret"]);
    let source = config
        .data_source_config(&mut prompt)
        .expect("credentials should be read");
    assert_eq!(prompt.asked, ["Username", "Password"]);
    let credentials = source.credentials.expect("credentials should be set");
    assert_eq!(credentials.username(), "kismet");
    assert_eq!(credentials.password(), "secret");
}

#[rstest]
fn rest_config_prompts_only_for_missing_password() {
    let config = ExportConfig::try_from(rest_args(Some("kismet"), None)).expect("valid");
    let mut prompt = ScriptedPrompt::answering(&["secret"]);
    config
        .data_source_config(&mut prompt)
        .expect("credentials should be read");
    assert_eq!(prompt.asked, ["Password"]);
}

#[rstest]
fn configured_credentials_skip_the_prompt() {
    let config =
        ExportConfig::try_from(rest_args(Some("kismet"), Some("secret"))).expect("valid");
    let mut prompt = ScriptedPrompt::default();
    config
        .data_source_config(&mut prompt)
        .expect("credentials should be set");
    assert!(prompt.asked.is_empty());
}

#[rstest]
fn empty_prompted_password_is_missing_credentials() {
    let config = ExportConfig::try_from(rest_args(None, None)).expect("valid arguments");
    let mut prompt = ScriptedPrompt::answering(&["kismet", ""]);
    let err = config
        .data_source_config(&mut prompt)
        .expect_err("empty password should fail");
    assert!(
        matches!(err, CliError::Extract(ExtractError::MissingCredentials)),
        "unexpected error {err:?}"
    );
}

#[rstest]
fn sqlite_config_never_prompts() {
    let config = ExportConfig::try_from(sqlite_args(None)).expect("valid arguments");
    let mut prompt = ScriptedPrompt::default();
    let source = config
        .data_source_config(&mut prompt)
        .expect("no credentials needed");
    assert!(prompt.asked.is_empty());
    assert!(source.credentials.is_none());
}

#[rstest]
fn exports_log_rows_to_stdout() {
    let log = KismetLog::with_devices(2, None);
    let path = log.path();
    let (outcome, stdout) = export_with_args(&["--db-file", path.as_str(), "--filter", LOG_FILTER]);
    let summary = outcome.expect("export should succeed");
    assert_eq!(summary, ExportSummary { written: 2, skipped: 0 });
    assert_eq!(
        stdout,
        "lat,lon,id,channel\n1,-1,dev-1,6\n2,-2,dev-2,6\n"
    );
}

#[rstest]
fn appending_reuses_existing_file_without_header() {
    let log = KismetLog::with_devices(1, None);
    let path = log.path();
    let output = log.resolve("nested/devices.csv");
    let base = ["--db-file", path.as_str(), "--filter", LOG_FILTER, "--output", output.as_str()];
    let (first, first_stdout) = export_with_args(&base);
    first.expect("first export should succeed");
    let appended: Vec<&str> = base.iter().copied().chain(["--append"]).collect();
    let (second, _) = export_with_args(&appended);
    second.expect("append should succeed");

    assert!(first_stdout.is_empty());
    assert_eq!(
        fs::read_to_string(&output).expect("read output"),
        "lat,lon,id,channel\n1,-1,dev-1,6\n1,-1,dev-1,6\n"
    );
}
