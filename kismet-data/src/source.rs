//! Backend selection and the uniform [`RecordSource`] facade.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use kismet_core::{ExtractError, Record, RecordSource, RestFilter, TableFilter};
use log::debug;
use url::Url;

use crate::rest::{
    Credentials, DEFAULT_USER_AGENT, HttpTransport, HttpTransportConfig, KismetTransport,
    RestRecords, Session, parse_base_url,
};
use crate::sqlite::SqliteRecords;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where to read records from and what to select.
///
/// Exactly one of the REST URL and the database file must be set; empty
/// values count as unset.
///
/// # Examples
///
/// ```
/// use kismet_core::ExtractError;
/// use kismet_data::{Backend, DataSourceConfig};
///
/// let config = DataSourceConfig::new("devices/avg_lat devices/avg_lon devices/devmac")
///     .with_db_file("survey.kismet");
/// assert!(matches!(config.resolve(), Ok(Backend::Sqlite(_))));
///
/// let both = config.with_rest_url("http://localhost:2501");
/// assert_eq!(both.resolve().err(), Some(ExtractError::AmbiguousBackend));
/// ```
#[derive(Debug, Clone)]
pub struct DataSourceConfig {
    /// Base URL of a Kismet server.
    pub rest_url: Option<String>,
    /// Path of a Kismet SQLite log.
    pub db_file: Option<PathBuf>,
    /// Whitespace-delimited filter specification.
    pub filter: String,
    /// Login for the REST API.
    pub credentials: Option<Credentials>,
    /// Timeout applied to every HTTP request.
    pub timeout: Duration,
    /// User agent sent with HTTP requests.
    pub user_agent: String,
}

impl DataSourceConfig {
    /// Start a configuration for the given filter specification.
    #[must_use]
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            rest_url: None,
            db_file: None,
            filter: filter.into(),
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Read from a Kismet server.
    #[must_use]
    pub fn with_rest_url(mut self, url: impl Into<String>) -> Self {
        self.rest_url = Some(url.into());
        self
    }

    /// Read from a Kismet SQLite log.
    #[must_use]
    pub fn with_db_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_file = Some(path.into());
        self
    }

    /// Log in with these credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the HTTP user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validate the configuration and pick the backend, without any I/O.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::AmbiguousBackend`] or [`ExtractError::NoBackend`]
    ///   unless exactly one backend is configured.
    /// - [`ExtractError::Filter`] when the filter does not suit the backend.
    /// - [`ExtractError::InvalidUrl`] or [`ExtractError::UnsupportedScheme`]
    ///   for a bad REST URL.
    /// - [`ExtractError::MissingCredentials`] for the REST backend without
    ///   credentials.
    pub fn resolve(&self) -> Result<Backend, ExtractError> {
        let rest_url = self
            .rest_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty());
        let db_file = self
            .db_file
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty());
        match (rest_url, db_file) {
            (Some(_), Some(_)) => Err(ExtractError::AmbiguousBackend),
            (None, None) => Err(ExtractError::NoBackend),
            (Some(url), None) => self.resolve_rest(url).map(Backend::Rest),
            (None, Some(path)) => Ok(Backend::Sqlite(SqliteBackend {
                path: path.to_path_buf(),
                filter: TableFilter::parse(&self.filter)?,
            })),
        }
    }

    fn resolve_rest(&self, url: &str) -> Result<RestBackend, ExtractError> {
        let base_url = parse_base_url(url)?;
        let filter = RestFilter::parse(&self.filter)?;
        let credentials = self
            .credentials
            .clone()
            .ok_or(ExtractError::MissingCredentials)?;
        Ok(RestBackend {
            transport: HttpTransportConfig::new(base_url)
                .with_timeout(self.timeout)
                .with_user_agent(self.user_agent.clone()),
            filter,
            credentials,
        })
    }
}

/// A validated REST backend selection.
#[derive(Debug, Clone)]
pub struct RestBackend {
    /// HTTP client settings, including the base URL.
    pub transport: HttpTransportConfig,
    /// Parsed field paths.
    pub filter: RestFilter,
    /// Login.
    pub credentials: Credentials,
}

impl RestBackend {
    /// Base URL of the Kismet server.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.transport.base_url
    }
}

/// A validated SQLite backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteBackend {
    /// Path of the log file.
    pub path: PathBuf,
    /// Parsed table and columns.
    pub filter: TableFilter,
}

/// The backend chosen by [`DataSourceConfig::resolve`].
#[derive(Debug, Clone)]
pub enum Backend {
    /// Kismet REST API.
    Rest(RestBackend),
    /// Kismet SQLite log.
    Sqlite(SqliteBackend),
}

/// A connected backend behind the [`RecordSource`] contract.
#[derive(Debug)]
pub enum DataSource<T = HttpTransport> {
    /// Records from the REST API.
    Rest(RestRecords<T>),
    /// Records from a SQLite log.
    Sqlite(SqliteRecords),
}

impl DataSource<HttpTransport> {
    /// Resolve the configuration and connect to the chosen backend.
    ///
    /// # Errors
    ///
    /// Returns configuration errors from [`DataSourceConfig::resolve`] and
    /// any failure from [`DataSource::connect`].
    pub fn open(config: &DataSourceConfig) -> Result<Self, ExtractError> {
        Self::connect(config.resolve()?)
    }

    /// Connect to a resolved backend.
    ///
    /// For the REST API this logs in and validates the session; for SQLite
    /// it opens the log read-only and checks the selected columns.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::ClientSetup`] when the HTTP client cannot be built.
    /// - Session errors from [`Session::establish`].
    /// - [`ExtractError::DatabaseFile`] when the log is not a regular file,
    ///   and errors from [`SqliteRecords::open`].
    pub fn connect(backend: Backend) -> Result<Self, ExtractError> {
        match backend {
            Backend::Rest(rest) => {
                debug!("connecting to Kismet REST API at {}", rest.base_url());
                let transport = HttpTransport::with_config(rest.transport)?;
                Self::with_transport(transport, &rest.credentials, rest.filter)
            }
            Backend::Sqlite(sqlite) => {
                debug!("opening Kismet log {}", sqlite.path.display());
                Self::open_log(&sqlite.path, sqlite.filter)
            }
        }
    }

    fn open_log(path: &Path, filter: TableFilter) -> Result<Self, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::DatabaseFile {
                path: path.display().to_string(),
            });
        }
        SqliteRecords::open(path, filter).map(Self::Sqlite)
    }
}

impl<T: KismetTransport> DataSource<T> {
    /// Log in through `transport` and read with `filter`.
    ///
    /// # Errors
    ///
    /// Session errors from [`Session::establish`].
    pub fn with_transport(
        transport: T,
        credentials: &Credentials,
        filter: RestFilter,
    ) -> Result<Self, ExtractError> {
        let session = Session::establish(transport, credentials)?;
        Ok(Self::Rest(RestRecords::new(session, filter)))
    }
}

impl<T: KismetTransport> RecordSource for DataSource<T> {
    fn headers(&self) -> Vec<String> {
        match self {
            Self::Rest(records) => records.headers(),
            Self::Sqlite(records) => records.headers(),
        }
    }

    fn next_record(&mut self) -> Result<Option<Record>, ExtractError> {
        match self {
            Self::Rest(records) => records.next_record(),
            Self::Sqlite(records) => records.next_record(),
        }
    }

    fn finish(&mut self) -> Result<(), ExtractError> {
        match self {
            Self::Rest(records) => records.finish(),
            Self::Sqlite(records) => records.finish(),
        }
    }
}
