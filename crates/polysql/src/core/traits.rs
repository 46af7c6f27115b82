//! Core traits implemented by every driver adapter.
//!
//! - [`Connection`]: owns a native database handle, runs ad-hoc SQL and
//!   prepares statements
//! - [`Statement`]: a native prepared statement with its parameter buffer
//! - [`ConnectionFactory`]: builds connections for a set of URL schemes
//!
//! # Ownership
//!
//! Connections are handed out as [`ConnectionHandle`] (`Rc<dyn Connection>`).
//! Driver statements keep a reference-counted pointer to the native
//! connection, and driver cursors keep one to the native statement, so any of
//! them may be dropped last without leaving a dangling handle. Handles are not
//! `Send`: a connection and everything derived from it belong to one thread.
//!
//! # Design Patterns
//!
//! - **Abstract Factory**: a [`ConnectionFactory`] creates the connection,
//!   statement and cursor family of one engine
//! - **Template Method**: the callback and buffered execution modes are
//!   default methods built on top of the driver's cursor

use std::ops::ControlFlow;
use std::rc::Rc;

use super::resultset::{for_each_detached, BufferedResultSet, CursorResultSet, StatsResult};
use super::row::Row;
use super::value::Value;
use crate::error::{Result, SqlError};

/// Shared connection handle.
pub type ConnectionHandle = Rc<dyn Connection>;

/// An open database connection.
pub trait Connection {
    /// Driver name (e.g. "sqlite", "postgresql").
    fn driver(&self) -> &'static str;

    /// Run `sql` without parameters and report affected rows.
    ///
    /// Drivers with multi-statement support run every statement of a
    /// `;`-separated batch and sum the affected rows; the others hand the text
    /// to the server unchanged.
    fn execute(&self, sql: &str) -> Result<StatsResult>;

    /// Prepare `sql` into a native statement.
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>>;
}

/// A prepared statement.
///
/// Parameter indices are 1-based. Binding a slot again replaces the previous
/// value. Slots never bound are sent as NULL.
pub trait Statement {
    /// Execute and return a forward-only cursor positioned on the first row.
    ///
    /// Executing again invalidates cursors produced by earlier executions.
    fn execute(&mut self) -> Result<Box<dyn CursorResultSet>>;

    /// Number of parameter markers.
    fn parameter_count(&self) -> usize;

    /// 1-based index of a named parameter, `None` when unknown or when the
    /// driver only supports positional parameters.
    fn parameter_index(&self, _name: &str) -> Option<usize> {
        None
    }

    /// Name of the parameter at 1-based `index`, if it has one.
    fn parameter_name(&self, _index: usize) -> Option<String> {
        None
    }

    /// Bind `value` at 1-based `index`.
    fn bind_value(&mut self, index: usize, value: &Value) -> Result<()>;

    /// Bind `value` to the parameter called `name`.
    fn bind_named_value(&mut self, name: &str, value: &Value) -> Result<()> {
        match self.parameter_index(name) {
            Some(index) => self.bind_value(index, value),
            None => Err(SqlError::bind(format!("unknown parameter name '{}'", name))),
        }
    }

    /// Execute and invoke `f` once per row with a detached copy.
    ///
    /// Returning [`ControlFlow::Break`] stops the fetch loop. Returns the
    /// number of rows handed to `f`.
    fn execute_with(
        &mut self,
        f: &mut dyn FnMut(&dyn Row) -> Result<ControlFlow<()>>,
    ) -> Result<usize> {
        let mut cursor = self.execute()?;
        for_each_detached(cursor.as_mut(), f)
    }

    /// Execute and materialize every row.
    fn execute_buffered(&mut self) -> Result<BufferedResultSet> {
        let mut cursor = self.execute()?;
        BufferedResultSet::from_cursor(cursor.as_mut())
    }
}

impl dyn Statement + '_ {
    /// Bind any value convertible into [`Value`] at 1-based `index`.
    ///
    /// ```rust,no_run
    /// # fn demo(stmt: &mut dyn polysql::core::Statement) -> polysql::Result<()> {
    /// stmt.bind(1, 42)?.bind(2, "Alice")?.bind(3, None::<i64>)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn bind(&mut self, index: usize, value: impl Into<Value>) -> Result<&mut Self> {
        self.bind_value(index, &value.into())?;
        Ok(self)
    }

    /// Bind NULL at 1-based `index`.
    pub fn bind_null(&mut self, index: usize) -> Result<&mut Self> {
        self.bind_value(index, &Value::Null)?;
        Ok(self)
    }

    /// Bind any value convertible into [`Value`] to a named parameter.
    pub fn bind_named(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.bind_named_value(name, &value.into())?;
        Ok(self)
    }

    /// Bind NULL to a named parameter.
    pub fn bind_named_null(&mut self, name: &str) -> Result<&mut Self> {
        self.bind_named_value(name, &Value::Null)?;
        Ok(self)
    }

    /// Callback execution with a closure.
    pub fn for_each<F>(&mut self, mut f: F) -> Result<usize>
    where
        F: FnMut(&dyn Row) -> Result<ControlFlow<()>>,
    {
        self.execute_with(&mut f)
    }
}

/// Creates connections for the URL schemes it supports.
pub trait ConnectionFactory: Send + Sync {
    /// Driver name reported by the connections it creates.
    fn name(&self) -> &'static str;

    /// Lower-case schemes routed to this factory.
    fn supported_schemes(&self) -> &'static [&'static str];

    /// Open a connection. `scheme` is the matched scheme and `target` the
    /// remainder of the URL after `scheme:`.
    fn create(&self, scheme: &str, target: &str) -> Result<ConnectionHandle>;
}
