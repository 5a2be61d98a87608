//! Kismet backends and the data-source facade.
//!
//! Responsibilities:
//! - Talk to the Kismet REST API through a session-cookie handshake.
//! - Read device rows from a Kismet SQLite log.
//! - Select exactly one backend from configuration and expose it through
//!   [`kismet_core::RecordSource`].
//!
//! Boundaries:
//! - Record shape, filters and errors live in `kismet-core`.
//! - Output formatting belongs to the CLI.
//!
//! Invariants:
//! - Every HTTP request carries a timeout.
//! - No global mutable state; each [`DataSource`] owns its client or
//!   connection.

#![forbid(unsafe_code)]

pub mod rest;
mod source;
pub mod sqlite;

pub use source::{Backend, DataSource, DataSourceConfig, RestBackend, SqliteBackend};
