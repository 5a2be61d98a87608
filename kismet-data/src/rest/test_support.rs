//! Test utilities for the REST backend.
//!
//! [`StubTransport`] is a deterministic [`KismetTransport`] returning
//! pre-configured replies for each endpoint and recording what it was asked,
//! so the session handshake and the record generator can be exercised
//! without a running Kismet server.

use std::cell::RefCell;

use kismet_core::ExtractError;
use url::Url;

use super::session::{Credentials, SessionToken};
use super::transport::{KismetTransport, TransportReply};

/// Base URL reported by [`StubTransport::new`].
pub const STUB_BASE_URL: &str = "http://localhost:2501";

/// Stub `KismetTransport` for testing.
///
/// Every endpoint answers `404` until configured.
///
/// # Example
///
/// ```
/// use kismet_data::rest::{Credentials, Session, SessionState, test_support::StubTransport};
///
/// let stub = StubTransport::accepting("abc123");
/// let credentials = Credentials::new("kismet", "secret")?;
/// let session = Session::establish(stub, &credentials)?;
/// assert_eq!(session.state(), SessionState::Validated);
/// # Ok::<(), kismet_core::ExtractError>(())
/// ```
#[derive(Debug)]
pub struct StubTransport {
    base_url: Url,
    login: Result<TransportReply, ExtractError>,
    session_check: Result<TransportReply, ExtractError>,
    devices: Result<TransportReply, ExtractError>,
    logins: RefCell<Vec<(String, String)>>,
    cookies: RefCell<Vec<String>>,
    queries: RefCell<Vec<String>>,
}

impl Default for StubTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StubTransport {
    /// Create a stub answering `404` on every endpoint.
    #[must_use]
    #[expect(
        clippy::expect_used,
        reason = "STUB_BASE_URL is a valid literal URL"
    )]
    pub fn new() -> Self {
        let base_url = Url::parse(STUB_BASE_URL).expect("stub base URL should parse");
        Self {
            base_url,
            login: Ok(TransportReply::with_status(404)),
            session_check: Ok(TransportReply::with_status(404)),
            devices: Ok(TransportReply::with_status(404)),
            logins: RefCell::new(Vec::new()),
            cookies: RefCell::new(Vec::new()),
            queries: RefCell::new(Vec::new()),
        }
    }

    /// Create a stub that issues `token` at login, confirms it and answers
    /// the device query with an empty array.
    #[must_use]
    pub fn accepting(token: &str) -> Self {
        Self::new()
            .with_login(Ok(
                TransportReply::with_status(200).with_cookie(super::SESSION_COOKIE, token)
            ))
            .with_session_check(Ok(TransportReply::with_status(200)))
            .with_devices_body("[]")
    }

    /// Replace the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Script the login reply.
    #[must_use]
    pub fn with_login(mut self, reply: Result<TransportReply, ExtractError>) -> Self {
        self.login = reply;
        self
    }

    /// Script the session check reply.
    #[must_use]
    pub fn with_session_check(mut self, reply: Result<TransportReply, ExtractError>) -> Self {
        self.session_check = reply;
        self
    }

    /// Script the device query reply.
    #[must_use]
    pub fn with_devices(mut self, reply: Result<TransportReply, ExtractError>) -> Self {
        self.devices = reply;
        self
    }

    /// Answer the device query with `200` and the given body.
    #[must_use]
    pub fn with_devices_body(self, body: impl Into<String>) -> Self {
        self.with_devices(Ok(TransportReply::with_status(200).with_body(body)))
    }

    /// Username and password pairs presented at login.
    #[must_use]
    pub fn logins(&self) -> Vec<(String, String)> {
        self.logins.borrow().clone()
    }

    /// `Cookie` headers presented after login, in request order.
    #[must_use]
    pub fn presented_cookies(&self) -> Vec<String> {
        self.cookies.borrow().clone()
    }

    /// Bodies of the device queries received.
    #[must_use]
    pub fn device_queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl KismetTransport for StubTransport {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn check_login(&self, credentials: &Credentials) -> Result<TransportReply, ExtractError> {
        self.logins.borrow_mut().push((
            credentials.username().to_owned(),
            credentials.password().to_owned(),
        ));
        self.login.clone()
    }

    fn check_session(&self, token: &SessionToken) -> Result<TransportReply, ExtractError> {
        self.cookies.borrow_mut().push(token.cookie_header());
        self.session_check.clone()
    }

    fn query_devices(
        &self,
        token: &SessionToken,
        body: &str,
    ) -> Result<TransportReply, ExtractError> {
        self.cookies.borrow_mut().push(token.cookie_header());
        self.queries.borrow_mut().push(body.to_owned());
        self.devices.clone()
    }
}
