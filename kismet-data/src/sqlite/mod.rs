//! Access to Kismet's SQLite log.
//!
//! A `.kismet` log stores one row per device. Coordinates are kept as
//! integers scaled by 100000, so `avg_lat = 1250000` is 12.5 degrees.
//! [`SqliteRecords`] streams the selected columns of one table or view and
//! rescales the coordinate columns.

mod columns;
mod records;

pub use columns::ColumnKind;
pub use records::{COORDINATE_SCALE, DEFAULT_PAGE_SIZE, SqliteRecords};
