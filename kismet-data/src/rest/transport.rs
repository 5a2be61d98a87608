//! HTTP plumbing behind the Kismet session handshake.
//!
//! [`KismetTransport`] is narrow: one method per endpoint, each
//! returning the raw [`TransportReply`]. Interpreting status codes and
//! cookies is left to [`super::Session`] and [`super::RestRecords`], so stub
//! transports only have to script replies.

use std::{fmt, future::Future, time::Duration};

use kismet_core::ExtractError;
use log::debug;
use reqwest::{
    Client, RequestBuilder,
    header::{ACCEPT, COOKIE},
};
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

use super::{DEVICES_PATH, LOGIN_PATH, SESSION_PATH, endpoint};
use super::session::{Credentials, SessionToken};

/// Default user agent for Kismet requests.
pub const DEFAULT_USER_AGENT: &str = "kismet-extract/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Status, cookies and body of one HTTP exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportReply {
    /// HTTP status code.
    pub status: u16,
    /// Cookies set by the response as `(name, value)` pairs.
    pub cookies: Vec<(String, String)>,
    /// Response body decoded as text.
    pub body: String,
}

impl TransportReply {
    /// Build a reply with the given status and no cookies or body.
    #[must_use]
    pub const fn with_status(status: u16) -> Self {
        Self {
            status,
            cookies: Vec::new(),
            body: String::new(),
        }
    }

    /// Attach a cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Attach a body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of the first non-empty cookie called `name`.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.as_str())
    }

    /// Whether the status is `200 OK`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Access to the three Kismet endpoints used for extraction.
pub trait KismetTransport {
    /// Base URL every endpoint is resolved against.
    fn base_url(&self) -> &Url;

    /// `GET /session/check_login` with basic authentication.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Connectivity`] or [`ExtractError::Timeout`]
    /// when no reply arrives. HTTP error statuses are replies, not errors.
    fn check_login(&self, credentials: &Credentials) -> Result<TransportReply, ExtractError>;

    /// `GET /session/check_session` presenting the session cookie.
    ///
    /// # Errors
    ///
    /// As for [`KismetTransport::check_login`].
    fn check_session(&self, token: &SessionToken) -> Result<TransportReply, ExtractError>;

    /// `POST /devices/summary/devices.json` with `json=<body>` form-encoded.
    ///
    /// # Errors
    ///
    /// As for [`KismetTransport::check_login`].
    fn query_devices(
        &self,
        token: &SessionToken,
        body: &str,
    ) -> Result<TransportReply, ExtractError>;
}

impl<T: KismetTransport + ?Sized> KismetTransport for Box<T> {
    fn base_url(&self) -> &Url {
        (**self).base_url()
    }

    fn check_login(&self, credentials: &Credentials) -> Result<TransportReply, ExtractError> {
        (**self).check_login(credentials)
    }

    fn check_session(&self, token: &SessionToken) -> Result<TransportReply, ExtractError> {
        (**self).check_session(token)
    }

    fn query_devices(
        &self,
        token: &SessionToken,
        body: &str,
    ) -> Result<TransportReply, ExtractError> {
        (**self).query_devices(token, body)
    }
}

/// Error type for [`HttpTransport`] construction failures.
#[derive(Debug, Error)]
pub enum TransportBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl From<TransportBuildError> for ExtractError {
    fn from(err: TransportBuildError) -> Self {
        Self::ClientSetup {
            message: err.to_string(),
        }
    }
}

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL of the Kismet server (e.g., `"http://localhost:2501"`).
    pub base_url: Url,
    /// Connect and request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl HttpTransportConfig {
    /// Create a configuration for the given base URL with default timeout
    /// and user agent.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// `reqwest`-backed [`KismetTransport`].
///
/// The transport exposes a synchronous interface and blocks on an owned
/// current-thread Tokio runtime. When called from inside a multi-threaded
/// runtime it borrows that runtime's handle through
/// [`tokio::task::block_in_place`] instead, so it never nests runtimes.
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
    runtime: Runtime,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(base_url: Url) -> Result<Self, TransportBuildError> {
        Self::with_config(HttpTransportConfig::new(base_url))
    }

    /// Create a transport with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: HttpTransportConfig) -> Result<Self, TransportBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(TransportBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// Configuration the transport was built with.
    #[must_use]
    pub const fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        endpoint(&self.config.base_url, path)
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<TransportReply, ExtractError> {
        let response = request
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        let status = response.status().as_u16();
        let cookies = response
            .cookies()
            .map(|cookie| (cookie.name().to_owned(), cookie.value().to_owned()))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        debug!("{url} answered HTTP {status} with {} body bytes", body.len());
        Ok(TransportReply {
            status,
            cookies,
            body,
        })
    }

    /// Convert a reqwest error into a connectivity-class `ExtractError`.
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> ExtractError {
        if error.is_timeout() {
            return ExtractError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        ExtractError::Connectivity {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

impl KismetTransport for HttpTransport {
    fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    fn check_login(&self, credentials: &Credentials) -> Result<TransportReply, ExtractError> {
        let url = self.url(LOGIN_PATH);
        let request = self
            .client
            .get(&url)
            .basic_auth(credentials.username(), Some(credentials.password()));
        self.block_on(self.send(request, &url))
    }

    fn check_session(&self, token: &SessionToken) -> Result<TransportReply, ExtractError> {
        let url = self.url(SESSION_PATH);
        let request = self.client.get(&url).header(COOKIE, token.cookie_header());
        self.block_on(self.send(request, &url))
    }

    fn query_devices(
        &self,
        token: &SessionToken,
        body: &str,
    ) -> Result<TransportReply, ExtractError> {
        let url = self.url(DEVICES_PATH);
        let request = self
            .client
            .post(&url)
            .header(COOKIE, token.cookie_header())
            .header(ACCEPT, "application/json")
            .form(&[("json", body)]);
        self.block_on(self.send(request, &url))
    }
}
