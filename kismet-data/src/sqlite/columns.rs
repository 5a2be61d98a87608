//! Declared column types the extractor understands.

/// Storage class expected from a column, derived from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Integer affinity (`INT`, `INTEGER`, `BIGINT`, ...).
    Integer,
    /// Integers read as booleans (`BOOL`, `BOOLEAN`).
    Boolean,
    /// Text affinity (`TEXT`, `VARCHAR`, `CHAR`, `CLOB`).
    Text,
}

impl ColumnKind {
    /// Classify a declared type following SQLite's affinity rules.
    ///
    /// Returns `None` for declarations that hold reals, blobs or nothing at
    /// all.
    ///
    /// # Examples
    ///
    /// ```
    /// use kismet_data::sqlite::ColumnKind;
    ///
    /// assert_eq!(ColumnKind::from_declared("BIGINT"), Some(ColumnKind::Integer));
    /// assert_eq!(ColumnKind::from_declared("varchar(17)"), Some(ColumnKind::Text));
    /// assert_eq!(ColumnKind::from_declared("BLOB"), None);
    /// ```
    #[must_use]
    pub fn from_declared(declared: &str) -> Option<Self> {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            Some(Self::Integer)
        } else if upper.contains("BOOL") {
            Some(Self::Boolean)
        } else if ["CHAR", "CLOB", "TEXT"]
            .iter()
            .any(|marker| upper.contains(marker))
        {
            Some(Self::Text)
        } else {
            None
        }
    }

    /// Whether values of this kind can hold a scaled coordinate.
    #[must_use]
    pub const fn holds_coordinate(self) -> bool {
        matches!(self, Self::Integer)
    }

    /// Whether values of this kind can identify a device.
    #[must_use]
    pub const fn holds_identifier(self) -> bool {
        matches!(self, Self::Integer | Self::Text)
    }
}
