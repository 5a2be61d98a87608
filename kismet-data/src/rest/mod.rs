//! Access to a running Kismet server through its REST API.
//!
//! The exchange is a fixed three-step sequence:
//!
//! 1. `GET /session/check_login` with HTTP basic auth. Kismet answers with a
//!    `KISMET` session cookie.
//! 2. `GET /session/check_session` with that cookie, confirming the session.
//! 3. `POST /devices/summary/devices.json` with a form field
//!    `json={"fields":[...]}`. Kismet answers with a JSON array holding one
//!    flat object per device, keyed by the leaf name of each field path.
//!
//! [`Session`] drives steps one and two, [`RestRecords`] issues step three
//! on the first pull and walks the decoded array. Both talk to the server
//! through the [`KismetTransport`] seam so they can be exercised against
//! [`test_support::StubTransport`].
//!
//! # Example
//!
//! ```no_run
//! use kismet_core::{RecordSource, RestFilter};
//! use kismet_data::rest::{
//!     Credentials, HttpTransport, HttpTransportConfig, RestRecords, Session, parse_base_url,
//! };
//! use std::time::Duration;
//!
//! let url = parse_base_url("http://localhost:2501")?;
//! let transport = HttpTransport::with_config(
//!     HttpTransportConfig::new(url).with_timeout(Duration::from_secs(10)),
//! )?;
//! let credentials = Credentials::new("kismet", "hunter2")?;
//! let session = Session::establish(transport, &credentials)?;
//! let filter = RestFilter::parse("loc.lat loc.lon kismet.device.base.macaddr")?;
//! let mut records = RestRecords::new(session, filter);
//! while let Some(record) = records.next_record()? {
//!     println!("{} {} {}", record.latitude(), record.longitude(), record.id);
//! }
//! records.finish()?;
//! # Ok::<(), kismet_core::ExtractError>(())
//! ```

use kismet_core::ExtractError;
use url::Url;

mod records;
mod session;
mod transport;

#[doc(hidden)]
pub mod test_support;

pub use records::RestRecords;
pub use session::{Credentials, Session, SessionState, SessionToken};
pub use transport::{
    DEFAULT_USER_AGENT, HttpTransport, HttpTransportConfig, KismetTransport, TransportBuildError,
    TransportReply,
};

/// Login endpoint, answered with the session cookie.
pub const LOGIN_PATH: &str = "/session/check_login";
/// Session validation endpoint.
pub const SESSION_PATH: &str = "/session/check_session";
/// Device summary endpoint.
pub const DEVICES_PATH: &str = "/devices/summary/devices.json";
/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "KISMET";

/// Parse and check a Kismet base URL.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidUrl`] when `raw` is not a URL and
/// [`ExtractError::UnsupportedScheme`] when it is neither `http` nor `https`.
///
/// # Examples
///
/// ```
/// use kismet_core::ExtractError;
/// use kismet_data::rest::parse_base_url;
///
/// assert!(parse_base_url("https://sensor.local:2501").is_ok());
/// assert!(matches!(
///     parse_base_url("ftp://sensor.local"),
///     Err(ExtractError::UnsupportedScheme { .. })
/// ));
/// ```
pub fn parse_base_url(raw: &str) -> Result<Url, ExtractError> {
    let url = Url::parse(raw.trim()).map_err(|err| ExtractError::InvalidUrl {
        url: raw.to_owned(),
        message: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ExtractError::UnsupportedScheme {
            url: raw.to_owned(),
            scheme: other.to_owned(),
        }),
    }
}

/// Join an endpoint path onto the base URL, keeping any path prefix the base
/// carries.
#[must_use]
pub fn endpoint(base: &Url, path: &str) -> String {
    format!("{}{path}", base.as_str().trim_end_matches('/'))
}
