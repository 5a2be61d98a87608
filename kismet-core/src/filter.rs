//! Field-path parsing for filter specifications.
//!
//! A filter specification is a whitespace-delimited list of field references.
//! Position matters: the first three references name the latitude, longitude
//! and identifier fields, in that order. Any further references become extra
//! fields.
//!
//! The REST API accepts Kismet field paths such as
//! `kismet.device.base.location/kismet.common.location.avg_loc/kismet.common.location.lat`
//! and echoes only the leaf name in its response, so [`RestFilter`] keeps the
//! full path for the request and derives the response key from the leaf.
//!
//! The SQLite log is addressed with `table/column` references. Every
//! reference in one [`TableFilter`] must name the same table.

use std::str::FromStr;

use thiserror::Error;

/// Minimum number of references: latitude, longitude and identifier.
pub const MIN_FIELDS: usize = 3;

const PATH_SEPARATOR: char = '/';

/// Errors raised while parsing a filter specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The specification contained no references at all.
    #[error("no filter specified; name the latitude, longitude and identifier fields")]
    Empty,
    /// Fewer than [`MIN_FIELDS`] references were supplied.
    #[error("filter names {found} field(s); need latitude, longitude, identifier at minimum")]
    TooFewFields {
        /// Number of references found.
        found: usize,
    },
    /// A database reference did not have the `table/column` shape.
    #[error("bad database filter {token:?}: expected table/column")]
    MalformedColumn {
        /// Offending reference.
        token: String,
    },
    /// A database reference named a different table from the first one.
    #[error("bad database filter {token:?}: table {found:?} differs from {expected:?}")]
    TableMismatch {
        /// Offending reference.
        token: String,
        /// Table named by the first reference.
        expected: String,
        /// Table named by the offending reference.
        found: String,
    },
}

/// The mandatory positions and extras of a parsed specification.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Positions<T> {
    latitude: T,
    longitude: T,
    identifier: T,
    extras: Vec<T>,
}

impl<T> Positions<T> {
    fn split(items: Vec<T>) -> Result<Self, FilterError> {
        let found = items.len();
        let mut iter = items.into_iter();
        match (iter.next(), iter.next(), iter.next()) {
            (Some(latitude), Some(longitude), Some(identifier)) => Ok(Self {
                latitude,
                longitude,
                identifier,
                extras: iter.collect(),
            }),
            _ => Err(count_error(found)),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        [&self.latitude, &self.longitude, &self.identifier]
            .into_iter()
            .chain(self.extras.iter())
    }
}

const fn count_error(found: usize) -> FilterError {
    if found == 0 {
        FilterError::Empty
    } else {
        FilterError::TooFewFields { found }
    }
}

fn tokens(spec: &str) -> Vec<&str> {
    spec.split_whitespace().collect()
}

/// A field reference for the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    path: String,
}

impl FieldPath {
    /// Wrap a raw field reference.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Full reference as sent to Kismet.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name Kismet uses for this field in responses: the segment after the
    /// last `/`.
    #[must_use]
    pub fn key(&self) -> &str {
        self.path
            .rsplit_once(PATH_SEPARATOR)
            .map_or(self.path.as_str(), |(_, leaf)| leaf)
    }

    /// Fallback response key: the part of [`Self::key`] after its last `.`,
    /// when the leaf is dotted.
    #[must_use]
    pub fn short_key(&self) -> Option<&str> {
        self.key()
            .rsplit_once('.')
            .map(|(_, suffix)| suffix)
            .filter(|suffix| !suffix.is_empty())
    }
}

/// Parsed filter for the REST backend.
///
/// # Examples
///
/// ```
/// use kismet_core::RestFilter;
///
/// let filter: RestFilter = "loc/lat loc/lon base/mac dot11/ssid".parse()?;
/// assert_eq!(filter.latitude().key(), "lat");
/// assert_eq!(filter.extras().len(), 1);
/// # Ok::<(), kismet_core::FilterError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestFilter {
    fields: Positions<FieldPath>,
}

impl RestFilter {
    /// Parse a whitespace-delimited specification.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Empty`] or [`FilterError::TooFewFields`] when
    /// fewer than [`MIN_FIELDS`] references are present.
    pub fn parse(spec: &str) -> Result<Self, FilterError> {
        let paths = tokens(spec).into_iter().map(FieldPath::new).collect();
        Ok(Self {
            fields: Positions::split(paths)?,
        })
    }

    /// Latitude reference.
    #[must_use]
    pub const fn latitude(&self) -> &FieldPath {
        &self.fields.latitude
    }

    /// Longitude reference.
    #[must_use]
    pub const fn longitude(&self) -> &FieldPath {
        &self.fields.longitude
    }

    /// Identifier reference.
    #[must_use]
    pub const fn identifier(&self) -> &FieldPath {
        &self.fields.identifier
    }

    /// References beyond the mandatory three.
    #[must_use]
    pub fn extras(&self) -> &[FieldPath] {
        &self.fields.extras
    }

    /// Every reference in request order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldPath> {
        self.fields.iter()
    }

    /// Every full path in request order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields().map(FieldPath::path)
    }

    /// Number of references.
    #[must_use]
    pub fn len(&self) -> usize {
        MIN_FIELDS + self.fields.extras.len()
    }

    /// Always `false`: a parsed filter holds at least [`MIN_FIELDS`] references.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl FromStr for RestFilter {
    type Err = FilterError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        Self::parse(spec)
    }
}

/// Parsed filter for the SQLite backend.
///
/// # Examples
///
/// ```
/// use kismet_core::TableFilter;
///
/// let filter: TableFilter = "devices/avg_lat devices/avg_lon devices/devmac".parse()?;
/// assert_eq!(filter.table(), "devices");
/// assert_eq!(filter.columns().collect::<Vec<_>>(), ["avg_lat", "avg_lon", "devmac"]);
/// # Ok::<(), kismet_core::FilterError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFilter {
    table: String,
    columns: Positions<String>,
}

impl TableFilter {
    /// Parse a whitespace-delimited list of `table/column` references.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Empty`] or [`FilterError::TooFewFields`] when
    /// fewer than [`MIN_FIELDS`] references are present (checked before the
    /// shape of any reference), [`FilterError::MalformedColumn`] for a
    /// reference that is not exactly `table/column`, and
    /// [`FilterError::TableMismatch`] when references disagree on the table.
    pub fn parse(spec: &str) -> Result<Self, FilterError> {
        let references = tokens(spec);
        if references.len() < MIN_FIELDS {
            return Err(count_error(references.len()));
        }

        let mut table: Option<&str> = None;
        let mut names = Vec::with_capacity(references.len());
        for token in references {
            let (token_table, column) = split_column(token)?;
            match table {
                None => table = Some(token_table),
                Some(expected) if expected != token_table => {
                    return Err(FilterError::TableMismatch {
                        token: token.to_owned(),
                        expected: expected.to_owned(),
                        found: token_table.to_owned(),
                    });
                }
                Some(_) => {}
            }
            names.push(column.to_owned());
        }

        Ok(Self {
            table: table.unwrap_or_default().to_owned(),
            columns: Positions::split(names)?,
        })
    }

    /// Table shared by every reference.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Latitude column.
    #[must_use]
    pub fn latitude(&self) -> &str {
        &self.columns.latitude
    }

    /// Longitude column.
    #[must_use]
    pub fn longitude(&self) -> &str {
        &self.columns.longitude
    }

    /// Identifier column.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.columns.identifier
    }

    /// Columns beyond the mandatory three.
    #[must_use]
    pub fn extras(&self) -> &[String] {
        &self.columns.extras
    }

    /// Every column in request order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

impl FromStr for TableFilter {
    type Err = FilterError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        Self::parse(spec)
    }
}

fn split_column(token: &str) -> Result<(&str, &str), FilterError> {
    let malformed = || FilterError::MalformedColumn {
        token: token.to_owned(),
    };
    let (table, column) = token.split_once(PATH_SEPARATOR).ok_or_else(malformed)?;
    if table.is_empty() || column.is_empty() || column.contains(PATH_SEPARATOR) {
        return Err(malformed());
    }
    Ok((table, column))
}
