//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use kismet_cli::CliError;

#[expect(
    clippy::print_stderr,
    reason = "the binary reports fatal errors on stderr"
)]
fn main() {
    match kismet_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("kismet-extract: {err}");
            std::process::exit(1);
        }
    }
}
