//! Facade crate for extracting located devices from Kismet.
//!
//! This crate re-exports the core record types and, behind the default
//! `backends` feature, the REST and SQLite data sources.

#![forbid(unsafe_code)]

pub use kismet_core::{
    ExtractError, FieldPath, FieldRole, FieldValue, FilterError, MANDATORY_HEADERS, MIN_FIELDS,
    Record, RecordSource, Records, RestFilter, TableFilter, headers_with_extras,
};

#[cfg(feature = "backends")]
pub use kismet_data::{Backend, DataSource, DataSourceConfig, RestBackend, SqliteBackend, rest};
