//! Database driver implementations.
//!
//! This module provides engine-specific implementations of the core traits:
//!
//! - [`sqlite`]: embedded SQLite through the native C API
//! - [`postgres`]: PostgreSQL through the blocking `postgres` client
//! - [`mysql`]: MariaDB/MySQL through the blocking `mysql` client
//! - [`odbc`]: any ODBC data source through the driver manager
//!
//! # Architecture
//!
//! Each driver module provides a `ConnectionFactory`, a `Connection`, a
//! `Statement` and a cursor. The cursor keeps an `Rc` to its statement state,
//! which keeps an `Rc` to the native connection.
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/`
//! 2. Implement `ConnectionFactory`, `Connection`, `Statement` and `CursorResultSet`
//! 3. Register the factory in [`register_builtins`]
//! 4. Gate the driver with a feature flag in `Cargo.toml`

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "odbc")]
pub mod odbc;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use crate::core::DriverCatalog;

/// Register every driver compiled into this build.
#[allow(unused_variables)]
pub fn register_builtins(catalog: &mut DriverCatalog) {
    #[cfg(feature = "sqlite")]
    catalog.register(sqlite::SqliteFactory);

    #[cfg(feature = "postgres")]
    catalog.register(postgres::PostgresFactory);

    #[cfg(feature = "mysql")]
    catalog.register(mysql::MysqlFactory);

    #[cfg(feature = "odbc")]
    catalog.register(odbc::OdbcFactory);
}

/// Shorten SQL text for log fields.
pub(crate) fn sql_preview(sql: &str) -> &str {
    const MAX: usize = 120;
    let sql = sql.trim();
    if sql.len() <= MAX {
        return sql;
    }
    let mut end = MAX;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
