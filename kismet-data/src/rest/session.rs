//! Session handshake with a Kismet server.

use std::fmt;

use kismet_core::ExtractError;
use log::debug;

use super::transport::{KismetTransport, TransportReply};
use super::{DEVICES_PATH, LOGIN_PATH, SESSION_COOKIE, SESSION_PATH, endpoint};

/// Username and password for Kismet's basic-auth login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Pair a username with a password.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::MissingCredentials`] when either part is empty.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ExtractError> {
        let credentials = Self {
            username: username.into(),
            password: password.into(),
        };
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(ExtractError::MissingCredentials);
        }
        Ok(credentials)
    }

    /// Login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Login password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The opaque `KISMET` cookie value issued at login.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    value: String,
}

impl SessionToken {
    /// Wrap a cookie value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Raw cookie value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// `Cookie` header presenting the token.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        format!("{SESSION_COOKIE}={}", self.value)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Lifecycle of a [`Session`].
///
/// Transitions are linear: `Unauthenticated → Authenticating →
/// Authenticated → Validated`, or `Failed` from any step. `Closed` follows
/// teardown. Nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No login attempted yet.
    Unauthenticated,
    /// Login request in flight.
    Authenticating,
    /// Cookie issued, not yet confirmed.
    Authenticated,
    /// Cookie confirmed; device queries are allowed.
    Validated,
    /// A step failed; the session is unusable.
    Failed,
    /// Torn down.
    Closed,
}

impl SessionState {
    /// Lowercase name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Validated => "validated",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated conversation with one Kismet server.
#[derive(Debug)]
pub struct Session<T> {
    transport: T,
    state: SessionState,
    token: Option<SessionToken>,
}

impl<T: KismetTransport> Session<T> {
    /// Wrap a transport without contacting the server.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            state: SessionState::Unauthenticated,
            token: None,
        }
    }

    /// Log in and confirm the session.
    ///
    /// # Errors
    ///
    /// Propagates the first failure from [`Session::authenticate`] or
    /// [`Session::validate`].
    pub fn establish(transport: T, credentials: &Credentials) -> Result<Self, ExtractError> {
        let mut session = Self::new(transport);
        session.authenticate(credentials)?;
        session.validate()?;
        Ok(session)
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Session token, present while authenticated or validated.
    #[must_use]
    pub const fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Log in with basic auth and capture the session cookie.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::Connectivity`] or [`ExtractError::Timeout`] when the
    ///   server cannot be reached.
    /// - [`ExtractError::Authentication`] when the server answers with a
    ///   status other than 200 or without a `KISMET` cookie.
    /// - [`ExtractError::SessionUnavailable`] when a login was already made.
    pub fn authenticate(&mut self, credentials: &Credentials) -> Result<(), ExtractError> {
        self.require(&[SessionState::Unauthenticated], "authenticate")?;
        self.state = SessionState::Authenticating;
        let url = endpoint(self.transport.base_url(), LOGIN_PATH);
        debug!("logging in to Kismet at {url} as {}", credentials.username());

        let reply = match self.transport.check_login(credentials) {
            Ok(reply) => reply,
            Err(err) => return Err(self.fail(err)),
        };
        match login_token(&reply) {
            Ok(token) => {
                self.token = Some(token);
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(reason) => Err(self.fail(ExtractError::Authentication { url, reason })),
        }
    }

    /// Confirm the session cookie with the server.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::SessionRejected`] when the server answers with a
    ///   status other than 200.
    /// - [`ExtractError::Connectivity`] or [`ExtractError::Timeout`] when the
    ///   server cannot be reached.
    /// - [`ExtractError::SessionUnavailable`] when not authenticated.
    pub fn validate(&mut self) -> Result<(), ExtractError> {
        let token = self.live_token(
            &[SessionState::Authenticated, SessionState::Validated],
            "validate the session",
        )?;
        let url = endpoint(self.transport.base_url(), SESSION_PATH);
        let reply = match self.transport.check_session(&token) {
            Ok(reply) => reply,
            Err(err) => return Err(self.fail(err)),
        };
        if !reply.is_ok() {
            return Err(self.fail(ExtractError::SessionRejected {
                url,
                status: reply.status,
            }));
        }
        debug!("Kismet session validated at {url}");
        self.state = SessionState::Validated;
        Ok(())
    }

    /// Send the device summary query with the session cookie.
    ///
    /// A non-200 answer means the session expired or was revoked while in use
    /// and fails the session.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::SessionRejected`] for a status other than 200.
    /// - [`ExtractError::Connectivity`] or [`ExtractError::Timeout`] when the
    ///   server cannot be reached.
    /// - [`ExtractError::SessionUnavailable`] unless validated.
    pub fn query_devices(&mut self, body: &str) -> Result<TransportReply, ExtractError> {
        let token = self.live_token(&[SessionState::Validated], "query devices")?;
        let url = endpoint(self.transport.base_url(), DEVICES_PATH);
        debug!("requesting device summary from {url}");
        let reply = match self.transport.query_devices(&token, body) {
            Ok(reply) => reply,
            Err(err) => return Err(self.fail(err)),
        };
        if !reply.is_ok() {
            return Err(self.fail(ExtractError::SessionRejected {
                url,
                status: reply.status,
            }));
        }
        Ok(reply)
    }

    /// Drop the token and mark the session closed.
    ///
    /// Returns `false` when the session was already closed.
    pub fn close(&mut self) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        self.token = None;
        self.state = SessionState::Closed;
        debug!("Kismet session closed");
        true
    }

    fn require(
        &self,
        allowed: &[SessionState],
        operation: &'static str,
    ) -> Result<(), ExtractError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ExtractError::SessionUnavailable {
                operation,
                state: self.state.as_str(),
            })
        }
    }

    fn live_token(
        &self,
        allowed: &[SessionState],
        operation: &'static str,
    ) -> Result<SessionToken, ExtractError> {
        self.require(allowed, operation)?;
        self.token
            .clone()
            .ok_or_else(|| ExtractError::SessionUnavailable {
                operation,
                state: self.state.as_str(),
            })
    }

    fn fail(&mut self, err: ExtractError) -> ExtractError {
        self.state = SessionState::Failed;
        self.token = None;
        err
    }
}

fn login_token(reply: &TransportReply) -> Result<SessionToken, String> {
    if !reply.is_ok() {
        return Err(format!("login answered HTTP status {}", reply.status));
    }
    reply
        .cookie(SESSION_COOKIE)
        .map(SessionToken::new)
        .ok_or_else(|| format!("login response carried no {SESSION_COOKIE} session cookie"))
}
