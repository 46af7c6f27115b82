//! SQLite driver.
//!
//! Talks to the C API re-exported by `rusqlite::ffi` so that statements and
//! cursors can share one native handle through `Rc`. `rusqlite::Statement`
//! borrows its connection and cannot be kept alive by a cursor that outlives
//! both.
//!
//! - [`SqliteFactory`]: opens `sqlite:` URLs
//! - [`SqliteConnection`]: owns the `sqlite3*` handle
//! - [`SqliteStatement`]: owns the `sqlite3_stmt*` handle
//! - [`SqliteCursor`]: steps the statement and exposes the current row live
//!
//! # Connection String
//!
//! ```text
//! sqlite::memory:
//! sqlite:memory:
//! sqlite:/path/to/data.db
//! sqlite:file:data.db?mode=ro
//! ```
//!
//! # Types
//!
//! SQLite is dynamically typed. Integers are read as 64-bit, booleans are
//! stored as 0/1 and column types follow the storage class of the first row.
//! Live rows convert through [`Value`](crate::core::Value) like detached ones.

mod cursor;
mod statement;

pub use cursor::SqliteCursor;
pub use statement::SqliteStatement;

use std::ffi::{CStr, CString};
use std::os::raw::c_int;
use std::ptr::{self, NonNull};
use std::rc::Rc;

use rusqlite::ffi;
use tracing::debug;

use super::sql_preview;
use crate::core::{Connection, ConnectionFactory, ConnectionHandle, Statement, StatsResult};
use crate::error::{Result, SqlError};

/// Creates [`SqliteConnection`]s for the `sqlite` scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteFactory;

impl ConnectionFactory for SqliteFactory {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn supported_schemes(&self) -> &'static [&'static str] {
        &["sqlite"]
    }

    fn create(&self, _scheme: &str, target: &str) -> Result<ConnectionHandle> {
        Ok(Rc::new(SqliteConnection::open(target)?))
    }
}

/// Map the URL remainder to a filename understood by `sqlite3_open_v2`.
pub(crate) fn database_path(target: &str) -> &str {
    match target {
        "" | "memory:" | ":memory:" | "//:memory:" => ":memory:",
        other => other.strip_prefix("//").unwrap_or(other),
    }
}

/// Owned `sqlite3*`, closed on drop.
pub(crate) struct DbHandle {
    raw: NonNull<ffi::sqlite3>,
}

impl DbHandle {
    pub(crate) fn as_ptr(&self) -> *mut ffi::sqlite3 {
        self.raw.as_ptr()
    }

    /// Snapshot of the change counters before a statement runs.
    pub(crate) fn mark(&self) -> ChangeMark {
        // SAFETY: the handle is open.
        unsafe {
            ChangeMark {
                total: ffi::sqlite3_total_changes(self.as_ptr()),
                rowid: ffi::sqlite3_last_insert_rowid(self.as_ptr()),
            }
        }
    }

    /// Rows changed and rowid generated since `mark`.
    ///
    /// `sqlite3_changes` keeps its value across DDL and reads, so it only
    /// counts when the total moved.
    pub(crate) fn stats_since(&self, mark: ChangeMark) -> StatsResult {
        let now = self.mark();
        let mut stats = StatsResult::default();
        if now.total != mark.total {
            // SAFETY: the handle is open.
            stats.affected_rows = unsafe { ffi::sqlite3_changes(self.as_ptr()).max(0) as u64 };
        }
        if now.rowid != mark.rowid {
            stats.last_insert_id = now.rowid.max(0) as u64;
        }
        stats
    }

    /// Extended result code and message of the last failed call.
    pub(crate) fn last_error(&self) -> (c_int, String) {
        // SAFETY: the handle is open for the lifetime of self.
        unsafe {
            let code = ffi::sqlite3_extended_errcode(self.as_ptr());
            (code, cstr_lossy(ffi::sqlite3_errmsg(self.as_ptr())))
        }
    }
}

impl Drop for DbHandle {
    fn drop(&mut self) {
        // SAFETY: statements hold an Rc to this handle and are finalized first.
        let rc = unsafe { ffi::sqlite3_close_v2(self.as_ptr()) };
        if rc != ffi::SQLITE_OK {
            tracing::warn!(code = rc, "sqlite3_close_v2 failed");
        }
    }
}

/// Change counters of a connection at one point in time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChangeMark {
    total: c_int,
    rowid: i64,
}

/// Owned `sqlite3_stmt*`, finalized on drop before its connection.
pub(crate) struct StmtHandle {
    raw: NonNull<ffi::sqlite3_stmt>,
    db: Rc<DbHandle>,
}

impl StmtHandle {
    pub(crate) fn as_ptr(&self) -> *mut ffi::sqlite3_stmt {
        self.raw.as_ptr()
    }

    pub(crate) fn db(&self) -> &DbHandle {
        &self.db
    }
}

impl Drop for StmtHandle {
    fn drop(&mut self) {
        // SAFETY: the statement was produced by sqlite3_prepare_v2 on self.db.
        unsafe {
            ffi::sqlite3_finalize(self.as_ptr());
        }
    }
}

/// Copy a possibly-null C string.
pub(crate) unsafe fn cstr_lossy(ptr: *const std::os::raw::c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// An open SQLite database.
pub struct SqliteConnection {
    db: Rc<DbHandle>,
}

impl SqliteConnection {
    /// Open (or create) the database named by the URL remainder.
    pub fn open(target: &str) -> Result<Self> {
        let path = database_path(target);
        let c_path = CString::new(path)
            .map_err(|_| SqlError::connection(ffi::SQLITE_MISUSE, "database path contains NUL"))?;
        let flags = ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE | ffi::SQLITE_OPEN_URI;

        let mut raw = ptr::null_mut();
        // SAFETY: c_path is NUL-terminated and raw receives the new handle.
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut raw, flags, ptr::null()) };
        let Some(raw) = NonNull::new(raw) else {
            return Err(SqlError::connection(rc, "out of memory opening database"));
        };
        // The handle is closed by DbHandle::drop even when opening failed.
        let db = DbHandle { raw };
        if rc != ffi::SQLITE_OK {
            let (code, message) = db.last_error();
            return Err(SqlError::connection(
                code,
                format!("{} ({})", message, path),
            ));
        }
        // SAFETY: the handle is open.
        unsafe {
            ffi::sqlite3_extended_result_codes(db.as_ptr(), 1);
        }

        debug!(driver = "sqlite", path, "Opened SQLite database");
        Ok(Self { db: Rc::new(db) })
    }

    /// Compile the first statement of `sql`, returning it with the byte offset
    /// of the unparsed tail. `None` when the text holds only whitespace or
    /// comments.
    fn prepare_next(&self, sql: &CStr, offset: usize) -> Result<(Option<StmtHandle>, usize)> {
        let bytes = sql.to_bytes();
        let start = bytes[offset..].as_ptr().cast::<std::os::raw::c_char>();
        let len = c_int::try_from(bytes.len() - offset)
            .map_err(|_| SqlError::prepare(ffi::SQLITE_TOOBIG, "statement too large"))?;

        let mut raw = ptr::null_mut();
        let mut tail = ptr::null();
        // SAFETY: start..start+len lies within sql, tail points into it.
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(self.db.as_ptr(), start, len, &mut raw, &mut tail)
        };
        if rc != ffi::SQLITE_OK {
            let (code, message) = self.db.last_error();
            return Err(SqlError::prepare(code, message));
        }
        let next = if tail.is_null() {
            bytes.len()
        } else {
            tail as usize - bytes.as_ptr() as usize
        };
        let handle = NonNull::new(raw).map(|raw| StmtHandle {
            raw,
            db: Rc::clone(&self.db),
        });
        Ok((handle, next))
    }
}

impl Connection for SqliteConnection {
    fn driver(&self) -> &'static str {
        "sqlite"
    }

    fn execute(&self, sql: &str) -> Result<StatsResult> {
        debug!(driver = "sqlite", sql = sql_preview(sql), "Executing batch");
        let c_sql = CString::new(sql)
            .map_err(|_| SqlError::prepare(ffi::SQLITE_MISUSE, "SQL text contains NUL"))?;
        let len = c_sql.as_bytes().len();

        let mut stats = StatsResult::default();
        let mut offset = 0;
        while offset < len {
            let (stmt, next) = self.prepare_next(&c_sql, offset)?;
            if next <= offset {
                break;
            }
            offset = next;
            let Some(stmt) = stmt else {
                continue;
            };
            let mark = self.db.mark();
            loop {
                // SAFETY: stmt is a live prepared statement.
                match unsafe { ffi::sqlite3_step(stmt.as_ptr()) } {
                    ffi::SQLITE_ROW => continue,
                    ffi::SQLITE_DONE => break,
                    _ => {
                        let (code, message) = self.db.last_error();
                        return Err(SqlError::execute(code, message));
                    }
                }
            }
            let step = self.db.stats_since(mark);
            stats.affected_rows += step.affected_rows;
            if step.last_insert_id != 0 {
                stats.last_insert_id = step.last_insert_id;
            }
        }
        Ok(stats)
    }

    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>> {
        debug!(driver = "sqlite", sql = sql_preview(sql), "Preparing statement");
        let c_sql = CString::new(sql)
            .map_err(|_| SqlError::prepare(ffi::SQLITE_MISUSE, "SQL text contains NUL"))?;
        match self.prepare_next(&c_sql, 0)? {
            (Some(stmt), _) => Ok(Box::new(SqliteStatement::new(stmt))),
            (None, _) => Err(SqlError::prepare(ffi::SQLITE_MISUSE, "empty statement")),
        }
    }
}
