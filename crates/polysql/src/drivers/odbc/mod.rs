//! ODBC database driver.
//!
//! Connects through the system driver manager with a single process-wide
//! environment. The text after `odbc:` is handed to the driver manager
//! unchanged:
//!
//! ```text
//! odbc:DSN=warehouse;UID=app;PWD=secret
//! odbc:Driver={ODBC Driver 18 for SQL Server};Server=localhost,1433;Database=app;...
//! ```
//!
//! Only positional `?` parameters are supported.

mod types;

pub use types::{decode, sql_type_code, value_type_for};

use std::cell::Cell;
use std::rc::Rc;
use std::sync::OnceLock;

use odbc_api::buffers::TextRowSet;
use odbc_api::handles::StatementImpl;
use odbc_api::parameter::InputParameter;
use odbc_api::{ConnectionOptions, Cursor, Environment, Prepared, ResultSetMetadata};
use tracing::{debug, info};

use super::sql_preview;
use crate::core::row::check_index;
use crate::core::{
    ColumnSet, Connection, ConnectionFactory, ConnectionHandle, CursorPosition, CursorResultSet,
    ParameterBuffer, Row, Statement, StatsResult, Value, ValueType,
};
use crate::error::{Result, SqlError};

/// Rows fetched per round trip.
const FETCH_BATCH: usize = 256;
/// Upper bound for a single text cell. Longer values fail the fetch.
const MAX_CELL_BYTES: usize = 65536;

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

/// The process-wide ODBC environment, created on first use.
fn environment() -> Result<&'static Environment> {
    if let Some(env) = ENVIRONMENT.get() {
        return Ok(env);
    }
    let env = Environment::new().map_err(|e| {
        let (code, message) = native_error(&e, "IM004");
        SqlError::connection(code, format!("Failed to create ODBC environment: {}", message))
    })?;
    Ok(ENVIRONMENT.get_or_init(|| env))
}

/// Driver native error code (or SQLSTATE-style fallback) and message.
fn native_error(e: &odbc_api::Error, fallback_code: &str) -> (String, String) {
    match e {
        odbc_api::Error::Diagnostics { record, .. } => {
            (record.native_error.to_string(), record.to_string())
        }
        other => (fallback_code.to_string(), other.to_string()),
    }
}

/// Fetch failure, with oversized cells reported as right truncation.
fn fetch_error(e: odbc_api::Error) -> SqlError {
    match e {
        odbc_api::Error::TooLargeValueForBuffer {
            indicator,
            buffer_index,
        } => {
            let size = indicator.map_or_else(|| "unknown".to_string(), |n| n.to_string());
            SqlError::fetch(
                "01004",
                format!(
                    "value of column {} ({} bytes) exceeds the {} byte cell limit",
                    buffer_index + 1,
                    size,
                    MAX_CELL_BYTES
                ),
            )
        }
        other => {
            let (code, message) = native_error(&other, "HY000");
            SqlError::fetch(code, message)
        }
    }
}

fn execute_error(e: odbc_api::Error) -> SqlError {
    let (code, message) = native_error(&e, "HY000");
    SqlError::execute(code, message)
}

/// Creates [`OdbcConnection`]s for `odbc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OdbcFactory;

impl ConnectionFactory for OdbcFactory {
    fn name(&self) -> &'static str {
        "odbc"
    }

    fn supported_schemes(&self) -> &'static [&'static str] {
        &["odbc"]
    }

    fn create(&self, _scheme: &str, target: &str) -> Result<ConnectionHandle> {
        Ok(Rc::new(OdbcConnection::connect(target)?))
    }
}

/// An open ODBC connection.
pub struct OdbcConnection {
    conn: Rc<odbc_api::Connection<'static>>,
}

impl OdbcConnection {
    pub fn connect(connection_string: &str) -> Result<Self> {
        let connection_string = connection_string.trim();
        if connection_string.is_empty() {
            return Err(SqlError::connection("IM002", "empty ODBC connection string"));
        }
        let conn = environment()?
            .connect_with_connection_string(connection_string, ConnectionOptions::default())
            .map_err(|e| {
                let (code, message) = native_error(&e, "08001");
                SqlError::connection(code, message)
            })?;
        info!(driver = "odbc", "Connected via ODBC");
        Ok(Self {
            conn: Rc::new(conn),
        })
    }
}

impl Connection for OdbcConnection {
    fn driver(&self) -> &'static str {
        "odbc"
    }

    /// Passes the text to the driver unchanged; batching is up to the driver.
    fn execute(&self, sql: &str) -> Result<StatsResult> {
        debug!(driver = "odbc", sql = sql_preview(sql), "Executing batch");
        let mut statement = self.conn.preallocate().map_err(execute_error)?;
        drain(statement.execute(sql, ()).map_err(execute_error)?)?;
        let affected = statement.row_count().map_err(execute_error)?.unwrap_or(0);
        Ok(StatsResult::new(affected as u64, 0))
    }

    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>> {
        debug!(driver = "odbc", sql = sql_preview(sql), "Preparing statement");
        let to_error = |e: odbc_api::Error| {
            let (code, message) = native_error(&e, "HY000");
            SqlError::prepare(code, message)
        };
        let prepared = self.conn.prepare(sql).map_err(to_error)?;
        // SAFETY: only the lifetime changes. The statement stores an Rc of
        // the connection and drops the handle first, so the handle never
        // outlives the connection it was allocated on.
        let mut prepared: Prepared<StatementImpl<'static>> =
            unsafe { std::mem::transmute(prepared) };
        let count = prepared.num_params().map_err(to_error)?;
        Ok(Box::new(OdbcStatement {
            prepared,
            _conn: Rc::clone(&self.conn),
            params: ParameterBuffer::new(usize::from(count)),
            generation: Rc::new(Cell::new(0)),
        }))
    }
}

/// Column metadata and text cells of a drained result set.
type Drained = (ColumnSet, Vec<Vec<Option<Vec<u8>>>>);

/// Read every row of the first result set, if the execution produced one.
fn drain<C: Cursor>(cursor: Option<C>) -> Result<Drained> {
    let mut columns = ColumnSet::new();
    let mut rows = Vec::new();
    let Some(mut cursor) = cursor else {
        return Ok((columns, rows));
    };

    let count = cursor.num_result_cols().map_err(fetch_error)?;
    let count = u16::try_from(count).unwrap_or(0);
    for col in 1..=count {
        let name = cursor.col_name(col).map_err(fetch_error)?;
        let data_type = cursor.col_data_type(col).map_err(fetch_error)?;
        columns.add(
            name,
            value_type_for(&data_type),
            sql_type_code(&data_type),
            "",
            "",
        );
    }
    if count == 0 {
        return Ok((columns, rows));
    }

    let buffers = TextRowSet::for_cursor(FETCH_BATCH, &mut cursor, Some(MAX_CELL_BYTES))
        .map_err(fetch_error)?;
    let mut block = cursor.bind_buffer(buffers).map_err(fetch_error)?;
    while let Some(batch) = block.fetch_with_truncation_check(true).map_err(fetch_error)? {
        for row_idx in 0..batch.num_rows() {
            let row = (0..usize::from(count))
                .map(|col_idx| batch.at(col_idx, row_idx).map(<[u8]>::to_vec))
                .collect();
            rows.push(row);
        }
    }
    Ok((columns, rows))
}

/// A natively prepared statement, executed again with the current bindings.
pub struct OdbcStatement {
    prepared: Prepared<StatementImpl<'static>>,
    _conn: Rc<odbc_api::Connection<'static>>,
    params: ParameterBuffer,
    generation: Rc<Cell<u64>>,
}

impl OdbcStatement {
    fn invalidate(&self) -> u64 {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        next
    }
}

impl Statement for OdbcStatement {
    fn execute(&mut self) -> Result<Box<dyn CursorResultSet>> {
        let generation = self.invalidate();
        debug!(driver = "odbc", "Executing prepared statement");

        let params: Vec<Box<dyn InputParameter>> =
            self.params.values().iter().map(types::parameter).collect();
        let (columns, rows) =
            drain(self.prepared.execute(params.as_slice()).map_err(execute_error)?)?;
        let affected = self.prepared.row_count().map_err(execute_error)?.unwrap_or(0);

        let value_types: Rc<[ValueType]> = columns.iter().map(|c| c.value_type).collect();
        let rows = rows
            .into_iter()
            .map(|cells| OdbcRow {
                cells,
                types: Rc::clone(&value_types),
            })
            .collect();

        Ok(Box::new(OdbcCursor {
            rows,
            index: 0,
            columns,
            stats: StatsResult::new(affected as u64, 0),
            generation,
            live: Rc::clone(&self.generation),
        }))
    }

    fn parameter_count(&self) -> usize {
        self.params.len()
    }

    fn bind_value(&mut self, index: usize, value: &Value) -> Result<()> {
        self.params.set(index, value.clone())?;
        self.invalidate();
        Ok(())
    }
}

/// Cursor over the rows returned by one execution.
pub struct OdbcCursor {
    rows: Vec<OdbcRow>,
    index: usize,
    columns: ColumnSet,
    stats: StatsResult,
    generation: u64,
    live: Rc<Cell<u64>>,
}

impl OdbcCursor {
    fn is_current(&self) -> bool {
        self.live.get() == self.generation
    }
}

impl CursorResultSet for OdbcCursor {
    fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    fn stats(&self) -> StatsResult {
        self.stats
    }

    fn has_row(&self) -> bool {
        self.is_current() && self.index < self.rows.len()
    }

    fn current(&self) -> Result<&dyn Row> {
        if !self.is_current() {
            return Err(SqlError::InvalidIterator);
        }
        self.rows
            .get(self.index)
            .map(|row| row as &dyn Row)
            .ok_or(SqlError::InvalidIterator)
    }

    fn advance(&mut self) -> Result<bool> {
        if !self.is_current() {
            return Err(SqlError::InvalidIterator);
        }
        if self.index < self.rows.len() {
            self.index += 1;
        }
        Ok(self.index < self.rows.len())
    }

    fn position(&self) -> CursorPosition {
        if self.has_row() {
            CursorPosition::At {
                statement: Rc::as_ptr(&self.live) as usize,
                token: self.index as u64,
            }
        } else {
            CursorPosition::End
        }
    }
}

/// One fetched row of text cells, parsed on access.
pub struct OdbcRow {
    cells: Vec<Option<Vec<u8>>>,
    types: Rc<[ValueType]>,
}

impl Row for OdbcRow {
    fn size(&self) -> usize {
        self.cells.len()
    }

    fn get_value(&self, index: usize) -> Result<Value> {
        check_index(index, self.cells.len())?;
        let value_type = self.types.get(index).copied().unwrap_or(ValueType::String);
        decode(self.cells[index].as_deref(), value_type)
    }
}
