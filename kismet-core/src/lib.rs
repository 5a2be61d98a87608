//! Core domain types for extracting located devices from Kismet.
//!
//! Both Kismet backends (the REST API and the SQLite log) are normalised into
//! the [`Record`] shape defined here. Backends implement [`RecordSource`];
//! consumers pull records until the source reports exhaustion.
//!
//! The first three requested fields are positional: latitude, longitude and
//! identifier. Every further field is carried through as an untyped
//! [`FieldValue`] in request order.

#![forbid(unsafe_code)]

use std::fmt;

use geo::Coord;

mod error;
pub mod filter;
mod source;
mod value;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::ExtractError;
pub use filter::{FieldPath, FilterError, MIN_FIELDS, RestFilter, TableFilter};
pub use source::{MANDATORY_HEADERS, RecordSource, Records, headers_with_extras};
pub use value::FieldValue;

/// A single located device.
///
/// Coordinates are WGS84 with `x = longitude`, `y = latitude`.
///
/// # Examples
///
/// ```
/// use kismet_core::{FieldValue, Record};
///
/// let record = Record::new("AA:BB", 12.5, -70.25).with_extras(vec![FieldValue::Integer(6)]);
/// assert_eq!(record.latitude(), 12.5);
/// assert_eq!(record.longitude(), -70.25);
/// assert!(record.has_extras());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Device identifier, such as a MAC address or a Kismet device key.
    pub id: String,
    /// Geospatial position.
    pub location: Coord,
    /// Values of the fields requested after the identifier, in request order.
    pub extras: Vec<FieldValue>,
}

impl Record {
    /// Build a record without extra fields.
    #[must_use]
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            location: Coord {
                x: longitude,
                y: latitude,
            },
            extras: Vec::new(),
        }
    }

    /// Attach the extra field values.
    #[must_use]
    pub fn with_extras(mut self, extras: Vec<FieldValue>) -> Self {
        self.extras = extras;
        self
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.location.y
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.location.x
    }

    /// Whether the filter requested fields beyond the mandatory three.
    #[must_use]
    pub fn has_extras(&self) -> bool {
        !self.extras.is_empty()
    }
}

/// Position of a mandatory field within a filter specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// First field.
    Latitude,
    /// Second field.
    Longitude,
    /// Third field.
    Identifier,
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::Identifier => "identifier",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn record_stores_longitude_as_x() {
        let record = Record::new("dev", 51.5, -0.1);
        assert_eq!(record.location, Coord { x: -0.1, y: 51.5 });
        assert_eq!(record.latitude(), 51.5);
        assert_eq!(record.longitude(), -0.1);
    }

    #[rstest]
    fn record_without_extras_reports_absence() {
        let record = Record::new("dev", 0.0, 0.0);
        assert!(!record.has_extras());
        let with = record.with_extras(vec![FieldValue::Null]);
        assert!(with.has_extras());
    }

    #[rstest]
    #[case(FieldRole::Latitude, "latitude")]
    #[case(FieldRole::Longitude, "longitude")]
    #[case(FieldRole::Identifier, "identifier")]
    fn field_roles_display_lowercase(#[case] role: FieldRole, #[case] expected: &str) {
        assert_eq!(role.to_string(), expected);
    }
}
