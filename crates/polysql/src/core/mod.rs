//! Core abstractions shared by every driver.
//!
//! - [`value`]: the dynamically-typed [`Value`] and its conversions
//! - [`row`]: the [`Row`] trait and the owned [`GenericRow`]
//! - [`resultset`]: column metadata and the cursor, buffered and callback
//!   result protocols
//! - [`params`]: the 1-based bound-parameter buffer
//! - [`traits`]: [`Connection`], [`Statement`] and [`ConnectionFactory`]
//! - [`catalog`]: scheme-keyed driver registry
//!
//! # Architecture
//!
//! The core defines engine-independent contracts; `drivers/sqlite`,
//! `drivers/postgres`, `drivers/mysql` and `drivers/odbc` implement them.
//! Callers only see trait objects and never branch on the engine.

pub mod catalog;
pub mod params;
pub mod resultset;
pub mod row;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use catalog::{split_scheme, DriverCatalog};
pub use params::ParameterBuffer;
pub use resultset::{
    for_each_detached, BufferedResultSet, ColumnInfo, ColumnSet, CursorPosition, CursorResultSet,
    Rows, StatsResult,
};
pub use row::{GenericRow, Row};
pub use traits::{Connection, ConnectionFactory, ConnectionHandle, Statement};
pub use value::{decode_hex, parse_bool, Blob, FromValue, Value, ValueType};
