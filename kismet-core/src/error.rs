//! The single failure type surfaced by record sources.

use thiserror::Error;

use crate::{FieldRole, FilterError};

/// Errors raised while configuring, connecting to or reading from a Kismet
/// backend.
///
/// Configuration errors are raised before any I/O. Connectivity and
/// authentication errors are worded so a user can tell a network problem from
/// a wrong password. Only [`ExtractError::UnparseableRow`] is non-fatal; see
/// [`ExtractError::is_fatal`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// The filter specification was rejected.
    #[error(transparent)]
    Filter(#[from] FilterError),
    /// The REST URL could not be parsed.
    #[error("invalid Kismet URL {url:?}: {message}")]
    InvalidUrl {
        /// URL as supplied.
        url: String,
        /// Parser diagnostic.
        message: String,
    },
    /// The REST URL used a scheme other than `http` or `https`.
    #[error("Kismet URL {url:?} must use http or https, not {scheme:?}")]
    UnsupportedScheme {
        /// URL as supplied.
        url: String,
        /// Scheme found in the URL.
        scheme: String,
    },
    /// The REST backend was selected without a username and password.
    #[error("a username and password are required for the Kismet REST API")]
    MissingCredentials,
    /// Both a REST URL and a database file were configured.
    #[error("choose either a Kismet REST URL or a database file, not both")]
    AmbiguousBackend,
    /// Neither a REST URL nor a database file was configured.
    #[error("no Kismet source configured; supply a REST URL or a database file")]
    NoBackend,
    /// The database path does not name an existing regular file.
    #[error("Kismet database {path:?} does not exist or is not a regular file")]
    DatabaseFile {
        /// Path as supplied.
        path: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to prepare HTTP client: {message}")]
    ClientSetup {
        /// Builder diagnostic.
        message: String,
    },
    /// The host could not be reached.
    #[error("could not reach Kismet at {url}: {message}")]
    Connectivity {
        /// Request URL.
        url: String,
        /// Transport diagnostic.
        message: String,
    },
    /// The host did not answer within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Timeout that elapsed.
        timeout_secs: u64,
    },
    /// Kismet answered but did not issue a session.
    #[error("failed to authenticate to Kismet at {url}: {reason}; check the username and password")]
    Authentication {
        /// Login URL.
        url: String,
        /// What was wrong with the answer.
        reason: String,
    },
    /// Kismet refused a request made with the session cookie.
    #[error("Kismet rejected the session at {url} with HTTP status {status}")]
    SessionRejected {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The session is not in a state that allows the requested operation.
    #[error("cannot {operation}: the Kismet session is {state}")]
    SessionUnavailable {
        /// Attempted operation.
        operation: &'static str,
        /// Current session state.
        state: &'static str,
    },
    /// The device query did not return a JSON array of objects.
    #[error("got invalid JSON from Kismet with filters {filters:?}: {message}")]
    InvalidJson {
        /// Field paths that were requested.
        filters: Vec<String>,
        /// Decoder diagnostic.
        message: String,
    },
    /// A selected column has a declared type the extractor cannot read.
    #[error("column {column:?} is declared {declared:?}; expected {expected}")]
    UnsupportedColumnType {
        /// Column name.
        column: String,
        /// Declared SQL type, empty when undeclared.
        declared: String,
        /// Types accepted for this position.
        expected: &'static str,
    },
    /// A latitude, longitude or identifier value had the wrong type.
    #[error("improper {role} field {name:?}: expected {expected}, found {found}")]
    MandatoryField {
        /// Which mandatory position failed.
        role: FieldRole,
        /// Field or column name.
        name: String,
        /// Accepted types.
        expected: &'static str,
        /// Rendering of the offending value.
        found: String,
    },
    /// An extra REST field held a value that is not a scalar.
    #[error("field {name:?} holds an unsupported {kind} value")]
    UnsupportedValue {
        /// Response key.
        name: String,
        /// JSON kind of the value.
        kind: &'static str,
    },
    /// An extra column in one SQLite row held an unsupported value; the row
    /// is skipped and extraction continues.
    #[error("could not parse row {row}: column {column:?} holds a {kind} value")]
    UnparseableRow {
        /// `rowid` of the skipped row, or its 1-based position in a relation
        /// without one.
        row: i64,
        /// Column name.
        column: String,
        /// Storage class of the value.
        kind: &'static str,
    },
    /// SQLite reported an error.
    #[error("Kismet database error: {message}")]
    Database {
        /// SQLite diagnostic.
        message: String,
    },
    /// The source was pulled after being finished.
    #[error("the Kismet source has already been closed")]
    SourceClosed,
}

impl ExtractError {
    /// Whether the error ends the extraction.
    ///
    /// # Examples
    ///
    /// ```
    /// use kismet_core::ExtractError;
    ///
    /// assert!(ExtractError::SourceClosed.is_fatal());
    /// let skipped = ExtractError::UnparseableRow {
    ///     row: 7,
    ///     column: "channel".to_owned(),
    ///     kind: "real",
    /// };
    /// assert!(!skipped.is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::UnparseableRow { .. })
    }

    /// Whether the error was raised while validating configuration, before
    /// any I/O took place.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Filter(_)
                | Self::InvalidUrl { .. }
                | Self::UnsupportedScheme { .. }
                | Self::MissingCredentials
                | Self::AmbiguousBackend
                | Self::NoBackend
                | Self::DatabaseFile { .. }
        )
    }

    /// Whether the error reports a network-level problem rather than bad
    /// credentials or bad data.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Connectivity { .. } | Self::Timeout { .. } | Self::SessionRejected { .. }
        )
    }
}
