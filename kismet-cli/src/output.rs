//! Output destination selection.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use kismet_fs::{WriteMode, create_output_file};

use crate::CliError;

/// Output value that selects standard output.
pub(crate) const STDOUT_OUTPUT: &str = "-";

/// Where exported rows go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OutputTarget {
    /// CSV on standard output.
    Stdout,
    /// CSV in a file.
    CsvFile(Utf8PathBuf),
}

impl OutputTarget {
    /// Pick the target for an `--output` value.
    ///
    /// The format is chosen by the extension appearing anywhere in the path,
    /// so `devices.csv.part` still selects CSV. KML is recognised but not
    /// written.
    pub(crate) fn parse(output: &str) -> Result<Self, CliError> {
        if output == STDOUT_OUTPUT {
            return Ok(Self::Stdout);
        }
        if output.contains(".csv") {
            return Ok(Self::CsvFile(Utf8PathBuf::from(output)));
        }
        if output.contains(".kml") {
            return Err(CliError::UnsupportedOutputFormat {
                output: output.to_owned(),
                format: "KML",
            });
        }
        Err(CliError::InvalidOutput {
            output: output.to_owned(),
        })
    }

    /// File path, when writing to a file.
    pub(crate) fn path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Stdout => None,
            Self::CsvFile(path) => Some(path),
        }
    }

    /// Open the target, writing to `stdout` for [`OutputTarget::Stdout`].
    pub(crate) fn open<'a>(
        &self,
        append: bool,
        stdout: &'a mut dyn Write,
    ) -> Result<Box<dyn Write + 'a>, CliError> {
        match self {
            Self::Stdout => Ok(Box::new(stdout)),
            Self::CsvFile(path) => {
                let mode = WriteMode::from_append(append);
                let file =
                    create_output_file(path, mode).map_err(|source| CliError::OpenOutput {
                        path: path.clone(),
                        source,
                    })?;
                Ok(Box::new(file))
            }
        }
    }
}
