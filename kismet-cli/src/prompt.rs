//! Interactive credential entry for the REST backend.

use std::io::{self, BufRead, Write};

use kismet_data::rest::Credentials;

use crate::CliError;

/// Reads a value the user did not configure.
pub(crate) trait CredentialPrompt {
    /// Show `label` and return the answer without its line ending.
    fn ask(&mut self, label: &str) -> io::Result<String>;

    /// Like [`CredentialPrompt::ask`], without echoing the answer.
    fn ask_secret(&mut self, label: &str) -> io::Result<String> {
        self.ask(label)
    }
}

/// Prompts on standard error and reads answers from standard input.
///
/// Secrets are read from the controlling terminal with echo disabled.
#[derive(Debug, Default)]
pub(crate) struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn ask(&mut self, label: &str) -> io::Result<String> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{label}: ")?;
        stderr.flush()?;
        read_answer(&mut io::stdin().lock())
    }

    fn ask_secret(&mut self, label: &str) -> io::Result<String> {
        rpassword::prompt_password(format!("{label}: "))
    }
}

fn read_answer(input: &mut dyn BufRead) -> io::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

/// Build credentials, asking for whichever part is missing.
///
/// The username is asked for before the password.
pub(crate) fn resolve_credentials(
    username: Option<String>,
    password: Option<String>,
    prompt: &mut dyn CredentialPrompt,
) -> Result<Credentials, CliError> {
    let user = username
        .filter(|value| !value.is_empty())
        .map_or_else(|| prompt.ask("Username"), Ok)
        .map_err(CliError::Prompt)?;
    let secret = password
        .filter(|value| !value.is_empty())
        .map_or_else(|| prompt.ask_secret("Password"), Ok)
        .map_err(CliError::Prompt)?;
    Credentials::new(user, secret).map_err(CliError::from)
}
