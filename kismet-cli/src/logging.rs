//! Logger installation for the CLI.

use env_logger::{Builder, Env};
use log::LevelFilter;

use crate::CliError;

const DEFAULT_FILTER: &str = "warn";

fn builder(verbose: bool) -> Builder {
    let mut builder = Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder
}

/// Install the process logger on standard error.
///
/// `--verbose` forces `debug`; otherwise `RUST_LOG` applies, defaulting to
/// `warn` so skipped rows are still reported.
pub(crate) fn init_logging(verbose: bool) -> Result<(), CliError> {
    builder(verbose).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn verbose_enables_debug() {
        assert_eq!(builder(true).build().filter(), LevelFilter::Debug);
    }
}
