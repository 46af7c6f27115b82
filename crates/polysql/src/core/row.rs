//! Row access.
//!
//! Two row flavours share the [`Row`] trait:
//!
//! - live rows, implemented by each driver, read through the native fetch
//!   buffer and are only reachable through a borrow of the cursor, so they
//!   cannot outlive the fetch step that produced them;
//! - [`GenericRow`], an owned copy used by the buffered and callback paths.

use std::ops::Index;

use super::value::{Blob, FromValue, Value};
use crate::error::{Result, SqlError};

/// Read access to one result row. Column indices are 0-based.
///
/// Drivers only have to provide [`size`](Row::size) and
/// [`get_value`](Row::get_value); the typed accessors default to the
/// [`Value`] conversions and are overridden where the native API has a
/// cheaper or engine-specific read.
pub trait Row {
    /// Number of columns.
    fn size(&self) -> usize;

    /// Value of column `index`, or [`SqlError::OutOfRange`].
    fn get_value(&self, index: usize) -> Result<Value>;

    fn get_value_string(&self, index: usize) -> Result<String> {
        Ok(self.get_value(index)?.to_text())
    }

    fn get_value_blob(&self, index: usize) -> Result<Blob> {
        Ok(self.get_value(index)?.to_blob())
    }

    fn get_value_bool(&self, index: usize) -> Result<bool> {
        Ok(self.get_value(index)?.to_bool())
    }

    fn get_value_int(&self, index: usize) -> Result<i32> {
        self.get_value(index)?.to_int()
    }

    fn get_value_int64(&self, index: usize) -> Result<i64> {
        self.get_value(index)?.to_int64()
    }

    fn get_value_double(&self, index: usize) -> Result<f64> {
        self.get_value(index)?.to_double()
    }

    /// All values of the row, in column order.
    fn get_values(&self) -> Result<Vec<Value>> {
        (0..self.size()).map(|i| self.get_value(i)).collect()
    }
}

impl dyn Row + '_ {
    /// Typed read of column `index`.
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T> {
        T::from_value(&self.get_value(index)?)
    }

    /// Owned copy of this row.
    pub fn detach(&self) -> Result<GenericRow> {
        GenericRow::from_row(self)
    }
}

/// Check a column index against a column count.
pub(crate) fn check_index(index: usize, size: usize) -> Result<()> {
    if index < size {
        Ok(())
    } else {
        Err(SqlError::out_of_range(index, size))
    }
}

/// An owned row, independent of any native buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericRow {
    values: Vec<Value>,
}

impl GenericRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// A row of `count` absent values.
    pub fn with_size(count: usize) -> Self {
        Self {
            values: vec![Value::None; count],
        }
    }

    /// Copy every value of `row`.
    pub fn from_row<R: Row + ?Sized>(row: &R) -> Result<Self> {
        Ok(Self {
            values: row.get_values()?,
        })
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    pub fn set_values(&mut self, values: Vec<Value>) {
        self.values = values;
    }

    /// Mutable access to one slot.
    pub fn value_mut(&mut self, index: usize) -> Result<&mut Value> {
        let size = self.values.len();
        self.values
            .get_mut(index)
            .ok_or_else(|| SqlError::out_of_range(index, size))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for GenericRow {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}

impl Index<usize> for GenericRow {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl Row for GenericRow {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn get_value(&self, index: usize) -> Result<Value> {
        check_index(index, self.values.len())?;
        Ok(self.values[index].clone())
    }

    fn get_values(&self) -> Result<Vec<Value>> {
        Ok(self.values.clone())
    }
}
