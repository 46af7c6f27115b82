//! ODBC type mapping.
//!
//! Rows are fetched through a text row set, so every value arrives as the
//! driver's character rendering and is parsed into the column's type here.
//! Binary columns are rendered by the driver manager as hex digits.

use odbc_api::parameter::{InputParameter, VarCharBox};
use odbc_api::{Bit, DataType, IntoParameter};

use crate::core::{decode_hex, Value, ValueType};
use crate::error::{Result, SqlError};

/// Column type of an ODBC SQL data type.
pub fn value_type_for(data_type: &DataType) -> ValueType {
    match data_type {
        DataType::Char { .. }
        | DataType::Varchar { .. }
        | DataType::LongVarchar { .. }
        | DataType::WChar { .. }
        | DataType::WVarchar { .. } => ValueType::String,
        DataType::Binary { .. } | DataType::Varbinary { .. } | DataType::LongVarbinary { .. } => {
            ValueType::Blob
        }
        DataType::Bit => ValueType::Bool,
        DataType::TinyInt | DataType::SmallInt | DataType::Integer => ValueType::Int,
        DataType::BigInt => ValueType::Int64,
        DataType::Real
        | DataType::Float { .. }
        | DataType::Double
        | DataType::Decimal { .. }
        | DataType::Numeric { .. } => ValueType::Double,
        _ => ValueType::Unsupported,
    }
}

/// `SQL_*` type code reported as a column's native type.
pub fn sql_type_code(data_type: &DataType) -> i32 {
    match data_type {
        DataType::Char { .. } => 1,
        DataType::Numeric { .. } => 2,
        DataType::Decimal { .. } => 3,
        DataType::Integer => 4,
        DataType::SmallInt => 5,
        DataType::Float { .. } => 6,
        DataType::Real => 7,
        DataType::Double => 8,
        DataType::Varchar { .. } => 12,
        DataType::Date => 91,
        DataType::Time { .. } => 92,
        DataType::Timestamp { .. } => 93,
        DataType::LongVarchar { .. } => -1,
        DataType::Binary { .. } => -2,
        DataType::Varbinary { .. } => -3,
        DataType::LongVarbinary { .. } => -4,
        DataType::BigInt => -5,
        DataType::TinyInt => -6,
        DataType::Bit => -7,
        DataType::WChar { .. } => -8,
        DataType::WVarchar { .. } => -9,
        _ => 0,
    }
}

/// Parse a fetched text cell into a [`Value`] of the column's type.
///
/// Unsupported columns fall back to their string rendering.
pub fn decode(text: Option<&[u8]>, value_type: ValueType) -> Result<Value> {
    let Some(bytes) = text else {
        return Ok(Value::Null);
    };
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    Ok(match value_type {
        ValueType::Bool => Value::Bool(parse_bool(trimmed)?),
        ValueType::Int => Value::Int(
            trimmed
                .parse()
                .map_err(|_| SqlError::parse(trimmed, "int"))?,
        ),
        ValueType::Int64 => Value::Int64(
            trimmed
                .parse()
                .map_err(|_| SqlError::parse(trimmed, "int64"))?,
        ),
        ValueType::Double => Value::Double(
            trimmed
                .parse()
                .map_err(|_| SqlError::parse(trimmed, "double"))?,
        ),
        ValueType::Blob => Value::Blob(decode_hex(trimmed)?),
        ValueType::NullValue => Value::Null,
        _ => Value::String(text.into_owned()),
    })
}

fn parse_bool(text: &str) -> Result<bool> {
    match text {
        "1" => Ok(true),
        "0" => Ok(false),
        t if t.eq_ignore_ascii_case("true") => Ok(true),
        t if t.eq_ignore_ascii_case("false") => Ok(false),
        t => Err(SqlError::parse(t, "bool")),
    }
}

/// Owned input parameter for a bound [`Value`].
pub(crate) fn parameter(value: &Value) -> Box<dyn InputParameter> {
    match value {
        Value::None | Value::Null => Box::new(VarCharBox::null()),
        Value::String(s) => Box::new(s.clone().into_parameter()),
        Value::Blob(b) => Box::new(b.clone().into_parameter()),
        Value::Bool(b) => Box::new(Bit::from_bool(*b)),
        Value::Int(i) => Box::new(*i),
        Value::Int64(i) => Box::new(*i),
        Value::Double(d) => Box::new(*d),
    }
}
