//! Record generator over one table of a Kismet SQLite log.

use std::{collections::VecDeque, fmt, path::Path};

use kismet_core::{
    ExtractError, FieldRole, FieldValue, Record, RecordSource, TableFilter, headers_with_extras,
};
use log::debug;
use rusqlite::{Connection, OpenFlags, Statement, params, types::Value};

use super::columns::ColumnKind;

/// Divisor turning stored integer coordinates into degrees.
pub const COORDINATE_SCALE: f64 = 100_000.0;

/// Rows fetched per round trip.
pub const DEFAULT_PAGE_SIZE: usize = 512;

/// Number of mandatory columns ahead of the extras.
const MANDATORY_COLUMNS: usize = 3;

/// One fetched row: its key and the selected cells in filter order.
///
/// The key is the `rowid`, or the 1-based position for relations without one.
#[derive(Debug)]
struct RawRow {
    key: i64,
    cells: Vec<Value>,
}

/// How successive pages are located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Paging {
    /// Keyed on the last `rowid` seen.
    Rowid,
    /// Skipping the rows already fetched; used for views and `WITHOUT ROWID`
    /// tables.
    Offset,
}

impl Paging {
    fn detect(connection: &Connection, table: &str) -> Self {
        let rowid_query = format!("SELECT rowid FROM {} LIMIT 0", quote_identifier(table));
        if connection.prepare(&rowid_query).is_ok() {
            Self::Rowid
        } else {
            Self::Offset
        }
    }

    /// Columns selected ahead of the filter's own.
    const fn key_columns(self) -> usize {
        match self {
            Self::Rowid => 1,
            Self::Offset => 0,
        }
    }
}

/// Streams the filtered columns of one table, view or `WITHOUT ROWID` table.
///
/// Tables are read in pages keyed on the last `rowid` seen, so no row is
/// emitted twice and emission order is strict. Relations without a `rowid`
/// are read in scan order with `LIMIT`/`OFFSET` pages over the read-only
/// connection. Declared column types are checked when the log is opened.
pub struct SqliteRecords {
    connection: Option<Connection>,
    filter: TableFilter,
    paging: Paging,
    extra_kinds: Vec<ColumnKind>,
    buffer: VecDeque<RawRow>,
    last_rowid: Option<i64>,
    fetched: i64,
    page_size: usize,
    exhausted: bool,
    fused: bool,
}

impl fmt::Debug for SqliteRecords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteRecords")
            .field("open", &self.connection.is_some())
            .field("table", &self.filter.table())
            .field("paging", &self.paging)
            .field("fetched", &self.fetched)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

impl SqliteRecords {
    /// Open the log read-only and check the selected columns.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::Database`] when the file cannot be opened or the
    ///   table or a column does not exist.
    /// - [`ExtractError::UnsupportedColumnType`] when a column's declared
    ///   type cannot be read at its position.
    pub fn open(path: &Path, filter: TableFilter) -> Result<Self, ExtractError> {
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|err| database_error(&err))?;
        Self::from_connection(connection, filter)
    }

    /// Use an already open connection.
    ///
    /// # Errors
    ///
    /// As for [`SqliteRecords::open`].
    pub fn from_connection(connection: Connection, filter: TableFilter) -> Result<Self, ExtractError> {
        let paging = Paging::detect(&connection, filter.table());
        let extra_kinds = {
            let statement = connection
                .prepare_cached(&page_query(&filter, paging, None))
                .map_err(|err| database_error(&err))?;
            column_kinds(&statement, &filter, paging.key_columns())?
        };
        debug!(
            "reading {} column(s) from Kismet table {:?}",
            extra_kinds.len() + MANDATORY_COLUMNS,
            filter.table()
        );
        Ok(Self {
            connection: Some(connection),
            filter,
            paging,
            extra_kinds,
            buffer: VecDeque::new(),
            last_rowid: None,
            fetched: 0,
            page_size: DEFAULT_PAGE_SIZE,
            exhausted: false,
            fused: false,
        })
    }

    /// Fetch `page_size` rows per round trip; zero is treated as one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The filter the generator reads.
    #[must_use]
    pub const fn filter(&self) -> &TableFilter {
        &self.filter
    }

    /// Whether the connection is still open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn fill_buffer(&mut self) -> Result<(), ExtractError> {
        let connection = self.connection.as_ref().ok_or(ExtractError::SourceClosed)?;
        let mut statement = connection
            .prepare_cached(&page_query(&self.filter, self.paging, self.last_rowid))
            .map_err(|err| database_error(&err))?;
        let limit = i64::try_from(self.page_size).unwrap_or(i64::MAX);
        let mut rows = match (self.paging, self.last_rowid) {
            (Paging::Rowid, None) => statement.query(params![limit]),
            (Paging::Rowid, Some(after)) => statement.query(params![after, limit]),
            (Paging::Offset, _) => statement.query(params![limit, self.fetched]),
        }
        .map_err(|err| database_error(&err))?;

        let first = self.paging.key_columns();
        let width = MANDATORY_COLUMNS + self.extra_kinds.len();
        let mut page = 0_usize;
        while let Some(row) = rows.next().map_err(|err| database_error(&err))? {
            let key = match self.paging {
                Paging::Rowid => {
                    let rowid: i64 = row.get(0).map_err(|err| database_error(&err))?;
                    self.last_rowid = Some(rowid);
                    rowid
                }
                Paging::Offset => self.fetched + 1,
            };
            let cells = (first..first + width)
                .map(|index| row.get::<_, Value>(index))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| database_error(&err))?;
            self.fetched += 1;
            self.buffer.push_back(RawRow { key, cells });
            page += 1;
        }
        if page < self.page_size {
            self.exhausted = true;
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<Record>, ExtractError> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fill_buffer()?;
        }
        let Some(row) = self.buffer.pop_front() else {
            return Ok(None);
        };
        decode_row(&row, &self.filter, &self.extra_kinds).map(Some)
    }
}

impl RecordSource for SqliteRecords {
    fn headers(&self) -> Vec<String> {
        headers_with_extras(self.filter.extras().iter().map(String::as_str))
    }

    fn next_record(&mut self) -> Result<Option<Record>, ExtractError> {
        if self.connection.is_none() {
            return Err(ExtractError::SourceClosed);
        }
        if self.fused {
            return Ok(None);
        }
        let outcome = self.advance();
        if let Err(err) = &outcome {
            if err.is_fatal() {
                self.fused = true;
            } else {
                debug!("skipping Kismet row: {err}");
            }
        }
        outcome
    }

    fn finish(&mut self) -> Result<(), ExtractError> {
        self.buffer.clear();
        match self.connection.take() {
            Some(connection) => {
                debug!("closing Kismet database");
                connection.close().map_err(|(_, err)| database_error(&err))
            }
            None => Ok(()),
        }
    }
}

fn database_error(err: &rusqlite::Error) -> ExtractError {
    ExtractError::Database {
        message: err.to_string(),
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Query for the page after `last_rowid`, or the first page when `None`.
fn page_query(filter: &TableFilter, paging: Paging, last_rowid: Option<i64>) -> String {
    let columns = filter
        .columns()
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ");
    let table = quote_identifier(filter.table());
    match (paging, last_rowid) {
        (Paging::Rowid, None) => {
            format!("SELECT rowid, {columns} FROM {table} ORDER BY rowid LIMIT ?1")
        }
        (Paging::Rowid, Some(_)) => format!(
            "SELECT rowid, {columns} FROM {table} WHERE rowid > ?1 ORDER BY rowid LIMIT ?2"
        ),
        (Paging::Offset, _) => format!("SELECT {columns} FROM {table} LIMIT ?1 OFFSET ?2"),
    }
}

/// Classify the selected columns and check the mandatory positions.
///
/// Returns the kinds of the extra columns.
fn column_kinds(
    statement: &Statement<'_>,
    filter: &TableFilter,
    key_columns: usize,
) -> Result<Vec<ColumnKind>, ExtractError> {
    let mut kinds = Vec::new();
    for (position, (column, name)) in statement
        .columns()
        .iter()
        .skip(key_columns)
        .zip(filter.columns())
        .enumerate()
    {
        let declared = column.decl_type().unwrap_or_default();
        let kind = ColumnKind::from_declared(declared)
            .and_then(|candidate| accepted_at(position, candidate))
            .ok_or_else(|| ExtractError::UnsupportedColumnType {
                column: name.to_owned(),
                declared: declared.to_owned(),
                expected: expected_at(position),
            })?;
        kinds.push(kind);
    }
    Ok(kinds.split_off(MANDATORY_COLUMNS.min(kinds.len())))
}

const fn accepted_at(position: usize, kind: ColumnKind) -> Option<ColumnKind> {
    let accepted = match position {
        0 | 1 => kind.holds_coordinate(),
        2 => kind.holds_identifier(),
        _ => true,
    };
    if accepted { Some(kind) } else { None }
}

const fn expected_at(position: usize) -> &'static str {
    match position {
        0 | 1 => "an integer type",
        2 => "an integer or text type",
        _ => "an integer, boolean or text type",
    }
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "stored coordinates are integers scaled by 100000"
)]
const fn descale(raw: i64) -> f64 {
    raw as f64 / COORDINATE_SCALE
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "NULL".to_owned(),
        Some(Value::Integer(number)) => number.to_string(),
        Some(Value::Real(number)) => number.to_string(),
        Some(Value::Text(text)) => format!("{text:?}"),
        Some(Value::Blob(bytes)) => format!("a {}-byte blob", bytes.len()),
    }
}

fn coordinate(value: Option<&Value>, role: FieldRole, column: &str) -> Result<f64, ExtractError> {
    match value {
        Some(Value::Integer(raw)) => Ok(descale(*raw)),
        other => Err(ExtractError::MandatoryField {
            role,
            name: column.to_owned(),
            expected: "an integer",
            found: describe(other),
        }),
    }
}

fn identifier(value: Option<&Value>, column: &str) -> Result<String, ExtractError> {
    match value {
        Some(Value::Text(text)) => Ok(text.clone()),
        Some(Value::Integer(number)) => Ok(number.to_string()),
        other => Err(ExtractError::MandatoryField {
            role: FieldRole::Identifier,
            name: column.to_owned(),
            expected: "an integer or text",
            found: describe(other),
        }),
    }
}

fn extra(value: &Value, kind: ColumnKind, row: i64, column: &str) -> Result<FieldValue, ExtractError> {
    match (value, kind) {
        (Value::Null, _) => Ok(FieldValue::Null),
        (Value::Integer(number), ColumnKind::Boolean) => Ok(FieldValue::Boolean(*number != 0)),
        (Value::Integer(number), _) => Ok(FieldValue::Integer(*number)),
        (Value::Text(text), _) => Ok(FieldValue::Text(text.clone())),
        (Value::Real(_), _) => Err(unparseable(row, column, "real")),
        (Value::Blob(_), _) => Err(unparseable(row, column, "blob")),
    }
}

fn unparseable(row: i64, column: &str, kind: &'static str) -> ExtractError {
    ExtractError::UnparseableRow {
        row,
        column: column.to_owned(),
        kind,
    }
}

fn decode_row(
    row: &RawRow,
    filter: &TableFilter,
    extra_kinds: &[ColumnKind],
) -> Result<Record, ExtractError> {
    let latitude = coordinate(row.cells.first(), FieldRole::Latitude, filter.latitude())?;
    let longitude = coordinate(row.cells.get(1), FieldRole::Longitude, filter.longitude())?;
    let id = identifier(row.cells.get(2), filter.identifier())?;
    let extras = row
        .cells
        .iter()
        .skip(MANDATORY_COLUMNS)
        .zip(extra_kinds)
        .zip(filter.extras())
        .map(|((value, kind), column)| extra(value, *kind, row.key, column))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Record::new(id, latitude, longitude).with_extras(extras))
}
