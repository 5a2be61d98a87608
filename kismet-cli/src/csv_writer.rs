//! Streams records from a [`RecordSource`] into CSV rows.

use std::io::Write;

use kismet_core::{Record, RecordSource};
use log::{debug, warn};

use crate::CliError;

/// Counts reported once an export completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportSummary {
    /// Records written as CSV rows.
    pub written: u64,
    /// Rows the backend could not parse.
    pub skipped: u64,
}

/// Write every record of `source` to `writer`, then finish the source.
///
/// The header row is omitted when `include_header` is false, which is how
/// appending to an existing export is done. Non-fatal errors skip the row
/// and are logged; the first fatal error aborts the export.
///
/// The source is finished on every path, including after a failure.
pub fn write_csv<S, W>(
    source: &mut S,
    writer: W,
    include_header: bool,
) -> Result<ExportSummary, CliError>
where
    S: RecordSource,
    W: Write,
{
    let outcome = write_rows(source, writer, include_header);
    let finished = source.finish();
    let summary = outcome?;
    finished?;
    debug!(
        "exported {} records, skipped {}",
        summary.written, summary.skipped
    );
    Ok(summary)
}

fn write_rows<S, W>(
    source: &mut S,
    writer: W,
    include_header: bool,
) -> Result<ExportSummary, CliError>
where
    S: RecordSource,
    W: Write,
{
    let mut rows = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    if include_header {
        rows.write_record(source.headers())?;
    }
    let mut summary = ExportSummary::default();
    for outcome in source.records() {
        match outcome {
            Ok(record) => {
                rows.write_record(row(&record))?;
                summary.written += 1;
            }
            Err(err) if !err.is_fatal() => {
                warn!("skipping row: {err}");
                summary.skipped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
    rows.flush().map_err(csv::Error::from)?;
    Ok(summary)
}

fn row(record: &Record) -> Vec<String> {
    [
        record.latitude().to_string(),
        record.longitude().to_string(),
        record.id.clone(),
    ]
    .into_iter()
    .chain(record.extras.iter().map(ToString::to_string))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kismet_core::{ExtractError, FieldValue, test_support::MemorySource};
    use rstest::rstest;

    fn skipped_row(row: i64) -> ExtractError {
        ExtractError::UnparseableRow {
            row,
            column: "channel".to_owned(),
            kind: "real",
        }
    }

    fn export(source: &mut MemorySource, include_header: bool) -> (String, ExportSummary) {
        let mut buffer = Vec::new();
        let summary = write_csv(source, &mut buffer, include_header).expect("export succeeds");
        (String::from_utf8(buffer).expect("UTF-8 CSV"), summary)
    }

    #[rstest]
    fn writes_header_and_rows() {
        let mut source = MemorySource::with_records(vec![
            Record::new("AA:BB", 12.5, -70.25).with_extras(vec![
                FieldValue::Integer(6),
                FieldValue::Null,
                FieldValue::Boolean(true),
            ]),
        ])
        .with_extra_headers(["channel", "ssid", "wep"]);
        let (csv, summary) = export(&mut source, true);
        assert_eq!(
            csv,
            "lat,lon,id,channel,ssid,wep\n12.5,-70.25,AA:BB,6,,true\n"
        );
        assert_eq!(summary, ExportSummary { written: 1, skipped: 0 });
        assert_eq!(source.releases(), 1);
    }

    #[rstest]
    fn append_omits_header() {
        let mut source = MemorySource::with_records(vec![Record::new("dev", 1.0, 2.0)]);
        let (csv, _) = export(&mut source, false);
        assert_eq!(csv, "1,2,dev\n");
    }

    #[rstest]
    fn quotes_identifiers_containing_commas() {
        let mut source = MemorySource::with_records(vec![Record::new("a,b", 0.5, 0.25)]);
        let (csv, _) = export(&mut source, false);
        assert_eq!(csv, "0.5,0.25,\"a,b\"\n");
    }

    #[rstest]
    fn counts_skipped_rows() {
        let mut source = MemorySource::new(vec![
            Ok(Record::new("one", 1.0, 1.0)),
            Err(skipped_row(2)),
            Ok(Record::new("three", 3.0, 3.0)),
        ]);
        let (csv, summary) = export(&mut source, false);
        assert_eq!(csv, "1,1,one\n3,3,three\n");
        assert_eq!(summary, ExportSummary { written: 2, skipped: 1 });
    }

    #[rstest]
    fn fatal_error_aborts_and_still_finishes() {
        let mut source = MemorySource::new(vec![
            Ok(Record::new("one", 1.0, 1.0)),
            Err(ExtractError::Database {
                message: "disk I/O error".to_owned(),
            }),
            Ok(Record::new("never", 0.0, 0.0)),
        ]);
        let mut buffer = Vec::new();
        let err = write_csv(&mut source, &mut buffer, true).expect_err("export should abort");
        assert!(
            matches!(err, CliError::Extract(ExtractError::Database { .. })),
            "unexpected error {err:?}"
        );
        assert_eq!(source.releases(), 1);
    }
}
