//! SQLite prepared statement.

use std::cell::Cell;
use std::ffi::CString;
use std::os::raw::c_int;
use std::rc::Rc;

use rusqlite::ffi;
use tracing::debug;

use super::cursor::SqliteCursor;
use super::{cstr_lossy, StmtHandle};
use crate::core::params::to_slot;
use crate::core::{CursorResultSet, Statement, Value};
use crate::error::{Result, SqlError};

/// Statement state shared with the cursors it produces.
pub(crate) struct SharedStmt {
    pub(crate) handle: StmtHandle,
    /// Bumped by every execute and rebind; cursors of an older generation are
    /// invalid.
    pub(crate) generation: Cell<u64>,
    /// Result of the last `sqlite3_step`.
    pub(crate) state: Cell<c_int>,
}

impl SharedStmt {
    pub(crate) fn ptr(&self) -> *mut ffi::sqlite3_stmt {
        self.handle.as_ptr()
    }

    /// Reset the native statement and invalidate every outstanding cursor.
    pub(crate) fn invalidate(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
        self.reset();
    }

    /// Rewind the statement; bindings are kept.
    pub(crate) fn reset(&self) {
        // SAFETY: the statement is live while self exists. The return code
        // repeats the last step error, which was already reported.
        unsafe {
            ffi::sqlite3_reset(self.ptr());
        }
        self.state.set(ffi::SQLITE_DONE);
    }

    /// True when a cursor of `generation` is positioned on a row.
    pub(crate) fn on_row(&self, generation: u64) -> bool {
        self.generation.get() == generation && self.state.get() == ffi::SQLITE_ROW
    }
}

/// A prepared SQLite statement.
///
/// Positional (`?`, `?NNN`) and named (`:name`, `@name`, `$name`) parameters
/// are supported.
pub struct SqliteStatement {
    shared: Rc<SharedStmt>,
    param_count: usize,
}

impl SqliteStatement {
    pub(crate) fn new(handle: StmtHandle) -> Self {
        // SAFETY: the statement is live.
        let count = unsafe { ffi::sqlite3_bind_parameter_count(handle.as_ptr()) };
        Self {
            shared: Rc::new(SharedStmt {
                handle,
                generation: Cell::new(0),
                state: Cell::new(ffi::SQLITE_DONE),
            }),
            param_count: count.max(0) as usize,
        }
    }

    fn native_index(&self, name: &str) -> Option<usize> {
        let c_name = CString::new(name).ok()?;
        // SAFETY: c_name is NUL-terminated; 0 means unknown.
        let index = unsafe { ffi::sqlite3_bind_parameter_index(self.shared.ptr(), c_name.as_ptr()) };
        (index > 0).then_some(index as usize)
    }

    fn check_bind(&self, rc: c_int, index: usize) -> Result<()> {
        if rc == ffi::SQLITE_OK {
            return Ok(());
        }
        let (code, message) = self.shared.handle.db().last_error();
        Err(SqlError::bind(format!(
            "parameter {}: {} [{}]",
            index, message, code
        )))
    }
}

impl Statement for SqliteStatement {
    fn execute(&mut self) -> Result<Box<dyn CursorResultSet>> {
        self.shared.invalidate();
        debug!(driver = "sqlite", "Executing prepared statement");

        let db = self.shared.handle.db();
        let mark = db.mark();
        // SAFETY: the statement is live and reset.
        let rc = unsafe { ffi::sqlite3_step(self.shared.ptr()) };
        match rc {
            ffi::SQLITE_ROW | ffi::SQLITE_DONE => {
                self.shared.state.set(rc);
                let stats = db.stats_since(mark);
                Ok(Box::new(SqliteCursor::new(Rc::clone(&self.shared), stats)))
            }
            _ => {
                let (code, message) = db.last_error();
                self.shared.reset();
                Err(SqlError::execute(code, message))
            }
        }
    }

    fn parameter_count(&self) -> usize {
        self.param_count
    }

    /// Exact native name first (`:id`), then the bare name with each prefix.
    fn parameter_index(&self, name: &str) -> Option<usize> {
        self.native_index(name).or_else(|| {
            if name.starts_with([':', '@', '$', '?']) {
                return None;
            }
            [':', '@', '$']
                .iter()
                .find_map(|prefix| self.native_index(&format!("{}{}", prefix, name)))
        })
    }

    fn parameter_name(&self, index: usize) -> Option<String> {
        let index = c_int::try_from(index).ok()?;
        // SAFETY: out-of-range indices and nameless parameters return NULL.
        let name = unsafe { ffi::sqlite3_bind_parameter_name(self.shared.ptr(), index) };
        if name.is_null() {
            None
        } else {
            // SAFETY: non-null names are NUL-terminated and owned by the statement.
            Some(unsafe { cstr_lossy(name) })
        }
    }

    fn bind_value(&mut self, index: usize, value: &Value) -> Result<()> {
        to_slot(index, self.param_count)?;
        // Binding is rejected while a step is in progress.
        self.shared.invalidate();

        let stmt = self.shared.ptr();
        let i = index as c_int;
        // SAFETY: stmt is live and reset; SQLITE_TRANSIENT makes sqlite copy
        // text and blob buffers before returning.
        let rc = unsafe {
            match value {
                Value::None | Value::Null => ffi::sqlite3_bind_null(stmt, i),
                Value::String(s) => ffi::sqlite3_bind_text(
                    stmt,
                    i,
                    s.as_ptr().cast(),
                    c_int::try_from(s.len()).map_err(|_| SqlError::bind("text too large"))?,
                    ffi::SQLITE_TRANSIENT(),
                ),
                // A zero-length blob with a null pointer would bind NULL.
                Value::Blob(b) if b.is_empty() => ffi::sqlite3_bind_zeroblob(stmt, i, 0),
                Value::Blob(b) => ffi::sqlite3_bind_blob(
                    stmt,
                    i,
                    b.as_ptr().cast(),
                    c_int::try_from(b.len()).map_err(|_| SqlError::bind("blob too large"))?,
                    ffi::SQLITE_TRANSIENT(),
                ),
                Value::Bool(b) => ffi::sqlite3_bind_int(stmt, i, c_int::from(*b)),
                Value::Int(v) => ffi::sqlite3_bind_int(stmt, i, *v),
                Value::Int64(v) => ffi::sqlite3_bind_int64(stmt, i, *v),
                Value::Double(v) => ffi::sqlite3_bind_double(stmt, i, *v),
            }
        };
        self.check_bind(rc, index)
    }
}
