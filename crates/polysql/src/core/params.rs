//! Bound-parameter buffer shared by the client/server adapters.
//!
//! Public parameter indices are 1-based; slots are stored 0-based. A slot that
//! was never bound holds [`Value::None`] and is sent as NULL.

use super::value::Value;
use crate::error::{Result, SqlError};

/// Translate a 1-based parameter index into a 0-based slot.
pub fn to_slot(index: usize, count: usize) -> Result<usize> {
    if index == 0 || index > count {
        return Err(SqlError::bind(format!(
            "parameter index {} out of range 1..={}",
            index, count
        )));
    }
    Ok(index - 1)
}

/// Parameter values waiting for the next execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBuffer {
    slots: Vec<Value>,
}

impl ParameterBuffer {
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![Value::None; count],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store `value` at 1-based `index`, replacing any earlier binding.
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let slot = to_slot(index, self.slots.len())?;
        self.slots[slot] = value;
        Ok(())
    }

    /// Value at 1-based `index`.
    pub fn get(&self, index: usize) -> Result<&Value> {
        let slot = to_slot(index, self.slots.len())?;
        Ok(&self.slots[slot])
    }

    pub fn values(&self) -> &[Value] {
        &self.slots
    }

    /// Forget every binding.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|v| *v = Value::None);
    }
}
