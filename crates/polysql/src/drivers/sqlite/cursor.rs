//! SQLite cursor and live row.

use std::os::raw::c_int;
use std::rc::Rc;
use std::slice;

use rusqlite::ffi;
use tracing::trace;

use super::cstr_lossy;
use super::statement::SharedStmt;
use crate::core::row::check_index;
use crate::core::{
    Blob, ColumnSet, CursorPosition, CursorResultSet, Row, StatsResult, Value, ValueType,
};
use crate::error::{Result, SqlError};

/// Value type of a storage class code.
pub(crate) fn storage_class_type(class: c_int) -> ValueType {
    match class {
        ffi::SQLITE_NULL => ValueType::NullValue,
        ffi::SQLITE_INTEGER => ValueType::Int64,
        ffi::SQLITE_FLOAT => ValueType::Double,
        ffi::SQLITE_TEXT => ValueType::String,
        ffi::SQLITE_BLOB => ValueType::Blob,
        _ => ValueType::Unsupported,
    }
}

/// Value type implied by a declared column type, following SQLite's column
/// affinity rules.
pub(crate) fn affinity_type(decltype: &str) -> ValueType {
    let decl = decltype.to_ascii_uppercase();
    if decl.contains("INT") {
        ValueType::Int64
    } else if decl.contains("CHAR") || decl.contains("CLOB") || decl.contains("TEXT") {
        ValueType::String
    } else if decl.is_empty() || decl.contains("BLOB") {
        ValueType::Blob
    } else {
        ValueType::Double
    }
}

/// Forward-only cursor over a stepped SQLite statement.
///
/// The cursor resets the statement when dropped, so an abandoned fetch loop
/// releases its read lock.
pub struct SqliteCursor {
    row: SqliteRow,
    columns: ColumnSet,
    stats: StatsResult,
    step: u64,
}

impl SqliteCursor {
    /// Build a cursor over a statement whose first step already ran.
    pub(crate) fn new(stmt: Rc<SharedStmt>, stats: StatsResult) -> Self {
        let ptr = stmt.ptr();
        let on_row = stmt.state.get() == ffi::SQLITE_ROW;

        // SAFETY: the statement is live and positioned (row or done).
        let columns = unsafe {
            let count = ffi::sqlite3_column_count(ptr).max(0);
            let mut columns = ColumnSet::new();
            for i in 0..count {
                let class = if on_row {
                    ffi::sqlite3_column_type(ptr, i)
                } else {
                    ffi::SQLITE_NULL
                };
                let decl = ffi::sqlite3_column_decltype(ptr, i);
                let value_type = match (on_row, class) {
                    (true, c) if c != ffi::SQLITE_NULL => storage_class_type(c),
                    _ if !decl.is_null() => affinity_type(&cstr_lossy(decl)),
                    (true, _) => ValueType::NullValue,
                    (false, _) => ValueType::None,
                };
                columns.add(
                    cstr_lossy(ffi::sqlite3_column_name(ptr, i)),
                    value_type,
                    class,
                    cstr_lossy(ffi::sqlite3_column_origin_name(ptr, i)),
                    cstr_lossy(ffi::sqlite3_column_table_name(ptr, i)),
                );
            }
            columns
        };

        let generation = stmt.generation.get();
        let mut row = SqliteRow {
            size: columns.len(),
            classes: Vec::new(),
            stmt,
            generation,
        };
        if on_row {
            row.capture_classes();
        }
        Self {
            row,
            columns,
            stats,
            step: 0,
        }
    }

    fn is_current(&self) -> bool {
        self.row.stmt.generation.get() == self.row.generation
    }
}

impl CursorResultSet for SqliteCursor {
    fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    fn stats(&self) -> StatsResult {
        self.stats
    }

    fn has_row(&self) -> bool {
        self.row.is_valid()
    }

    fn current(&self) -> Result<&dyn Row> {
        if self.row.is_valid() {
            Ok(&self.row)
        } else {
            Err(SqlError::InvalidIterator)
        }
    }

    fn advance(&mut self) -> Result<bool> {
        if !self.is_current() {
            return Err(SqlError::InvalidIterator);
        }
        let stmt = &self.row.stmt;
        if stmt.state.get() != ffi::SQLITE_ROW {
            return Ok(false);
        }
        // SAFETY: the statement belongs to this cursor's generation.
        let rc = unsafe { ffi::sqlite3_step(stmt.ptr()) };
        stmt.state.set(rc);
        match rc {
            ffi::SQLITE_ROW => {
                self.row.capture_classes();
                self.step += 1;
                trace!(driver = "sqlite", step = self.step, "Fetched row");
                Ok(true)
            }
            ffi::SQLITE_DONE => Ok(false),
            _ => {
                let (code, message) = stmt.handle.db().last_error();
                stmt.reset();
                Err(SqlError::fetch(code, message))
            }
        }
    }

    fn position(&self) -> CursorPosition {
        if self.row.is_valid() {
            CursorPosition::At {
                statement: Rc::as_ptr(&self.row.stmt) as usize,
                token: self.step,
            }
        } else {
            CursorPosition::End
        }
    }
}

impl Drop for SqliteCursor {
    fn drop(&mut self) {
        if self.is_current() {
            self.row.stmt.reset();
        }
    }
}

/// Live view of the row the statement is positioned on.
///
/// Storage classes are captured once per fetch step and decide how each
/// column is read, so no accessor triggers a native type conversion. Every
/// accessor fails with [`SqlError::InvalidIterator`] once the statement
/// moved on.
pub struct SqliteRow {
    stmt: Rc<SharedStmt>,
    generation: u64,
    size: usize,
    classes: Vec<c_int>,
}

impl SqliteRow {
    fn is_valid(&self) -> bool {
        self.stmt.on_row(self.generation)
    }

    fn capture_classes(&mut self) {
        let ptr = self.stmt.ptr();
        // SAFETY: called right after a step that produced a row.
        self.classes = (0..self.size as c_int)
            .map(|col| unsafe { ffi::sqlite3_column_type(ptr, col) })
            .collect();
    }

    fn text(&self, col: c_int) -> String {
        // SAFETY: only called on TEXT columns of the current row. The pointer
        // stays valid until the next step or reset.
        unsafe {
            let ptr = ffi::sqlite3_column_text(self.stmt.ptr(), col);
            if ptr.is_null() {
                return String::new();
            }
            let len = ffi::sqlite3_column_bytes(self.stmt.ptr(), col).max(0) as usize;
            String::from_utf8_lossy(slice::from_raw_parts(ptr, len)).into_owned()
        }
    }

    fn blob(&self, col: c_int) -> Blob {
        // SAFETY: only called on BLOB columns of the current row.
        unsafe {
            let ptr = ffi::sqlite3_column_blob(self.stmt.ptr(), col);
            let len = ffi::sqlite3_column_bytes(self.stmt.ptr(), col).max(0) as usize;
            if ptr.is_null() || len == 0 {
                return Blob::new();
            }
            slice::from_raw_parts(ptr.cast::<u8>(), len).to_vec()
        }
    }
}

/// Typed accessors use the [`Row`] defaults, so a live row answers exactly
/// like its detached copy.
impl Row for SqliteRow {
    fn size(&self) -> usize {
        self.size
    }

    fn get_value(&self, index: usize) -> Result<Value> {
        if !self.is_valid() {
            return Err(SqlError::InvalidIterator);
        }
        check_index(index, self.size)?;
        let col = index as c_int;
        let ptr = self.stmt.ptr();
        Ok(match self.classes.get(index).copied() {
            Some(ffi::SQLITE_NULL) => Value::Null,
            // SAFETY: col is in range and the statement is on a row.
            Some(ffi::SQLITE_INTEGER) => Value::Int64(unsafe { ffi::sqlite3_column_int64(ptr, col) }),
            Some(ffi::SQLITE_FLOAT) => Value::Double(unsafe { ffi::sqlite3_column_double(ptr, col) }),
            Some(ffi::SQLITE_TEXT) => Value::String(self.text(col)),
            Some(ffi::SQLITE_BLOB) => Value::Blob(self.blob(col)),
            _ => Value::None,
        })
    }
}
