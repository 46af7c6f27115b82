//! # polysql
//!
//! One blocking API over several SQL client libraries.
//!
//! polysql connects to a database from a scheme-prefixed URL, prepares
//! statements, binds parameters and reads results through a single
//! dynamically-typed [`Value`] model:
//!
//! - **Drivers** for SQLite, PostgreSQL, MariaDB/MySQL and ODBC, each behind a
//!   Cargo feature
//! - **Three result protocols**: lazy cursor with live rows, buffered
//!   random-access table, and per-row callbacks
//! - **Shared ownership** of native handles: cursors keep their statement and
//!   connection alive
//! - **Connection profiles** loaded from YAML
//!
//! ## Example
//!
//! ```rust,no_run
//! use polysql::core::{Row, Value};
//!
//! fn main() -> polysql::Result<()> {
//!     let conn = polysql::connect("sqlite::memory:")?.expect("sqlite driver");
//!     conn.execute(
//!         "CREATE TABLE people (id INTEGER, name TEXT);
//!          INSERT INTO people VALUES (1, 'Alice'), (2, 'Bob');",
//!     )?;
//!
//!     let mut stmt = conn.prepare("SELECT id, name FROM people WHERE id >= ?")?;
//!     stmt.bind(1, 1)?;
//!     let people = stmt.execute_buffered()?;
//!     assert_eq!(people.row_count(), 2);
//!     assert_eq!(people.get_row(0)?.get_value_string(1)?, "Alice");
//!
//!     let mut cursor = stmt.execute()?;
//!     let mut rows = cursor.rows();
//!     while let Some(row) = rows.next()? {
//!         println!("{} {}", row.get_value_int(0)?, row.get_value(1)?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;

// Re-exports for convenient access
pub use config::{Config, ConnectionConfig, OutputConfig, OutputFormat};
pub use core::{
    BufferedResultSet, Connection, ConnectionHandle, CursorResultSet, DriverCatalog, GenericRow,
    Row, Statement, StatsResult, Value, ValueType,
};
pub use error::{Result, SqlError};

/// Open a connection with the built-in drivers.
///
/// Returns `Ok(None)` when no compiled-in driver handles the URL scheme.
pub fn connect(url: &str) -> Result<Option<ConnectionHandle>> {
    DriverCatalog::with_builtins().create_connection(url)
}
