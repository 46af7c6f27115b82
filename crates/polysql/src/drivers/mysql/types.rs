//! MariaDB/MySQL type mapping.

use mysql::consts::{ColumnFlags, ColumnType};

use crate::core::{Value, ValueType};
use crate::error::{Result, SqlError};

/// Column type of a MySQL field.
///
/// `TINYINT(1)` is treated as a boolean.
pub fn value_type_for(column_type: ColumnType, flags: ColumnFlags, length: u32) -> ValueType {
    use ColumnType::*;
    match column_type {
        MYSQL_TYPE_TINY if length == 1 => ValueType::Bool,
        MYSQL_TYPE_TINY | MYSQL_TYPE_SHORT | MYSQL_TYPE_LONG | MYSQL_TYPE_INT24
        | MYSQL_TYPE_YEAR => ValueType::Int,
        MYSQL_TYPE_LONGLONG => ValueType::Int64,
        MYSQL_TYPE_FLOAT | MYSQL_TYPE_DOUBLE | MYSQL_TYPE_DECIMAL | MYSQL_TYPE_NEWDECIMAL => {
            ValueType::Double
        }
        MYSQL_TYPE_VARCHAR | MYSQL_TYPE_VAR_STRING | MYSQL_TYPE_STRING | MYSQL_TYPE_TINY_BLOB
        | MYSQL_TYPE_MEDIUM_BLOB | MYSQL_TYPE_LONG_BLOB | MYSQL_TYPE_BLOB | MYSQL_TYPE_ENUM
        | MYSQL_TYPE_SET | MYSQL_TYPE_JSON => {
            if flags.contains(ColumnFlags::BINARY_FLAG) {
                ValueType::Blob
            } else {
                ValueType::String
            }
        }
        MYSQL_TYPE_NULL => ValueType::NullValue,
        _ => ValueType::Unsupported,
    }
}

/// Convert a fetched protocol value into a [`Value`] of the column's type.
///
/// The text protocol delivers every value as bytes; the binary protocol
/// delivers numbers natively. Both are accepted.
pub fn decode(value: &mysql::Value, value_type: ValueType) -> Result<Value> {
    use mysql::Value as My;

    if matches!(value, My::NULL) {
        return Ok(Value::Null);
    }
    Ok(match value_type {
        ValueType::Bool => Value::Bool(integer(value)? != 0),
        ValueType::Int => Value::Int(integer(value)? as i32),
        ValueType::Int64 => Value::Int64(integer(value)?),
        ValueType::Double => Value::Double(float(value)?),
        ValueType::String => match value {
            My::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            other => Value::String(other.as_sql(true)),
        },
        ValueType::Blob => match value {
            My::Bytes(b) => Value::Blob(b.clone()),
            other => Value::Blob(other.as_sql(true).into_bytes()),
        },
        ValueType::NullValue => Value::Null,
        _ => Value::None,
    })
}

fn integer(value: &mysql::Value) -> Result<i64> {
    use mysql::Value as My;
    match value {
        My::Int(i) => Ok(*i),
        My::UInt(u) => Ok(*u as i64),
        My::Float(f) => Ok(*f as i64),
        My::Double(d) => Ok(*d as i64),
        My::Bytes(b) => {
            let text = String::from_utf8_lossy(b);
            text.trim()
                .parse()
                .map_err(|_| SqlError::parse(text.as_ref(), "int64"))
        }
        other => Err(SqlError::parse(other.as_sql(true), "int64")),
    }
}

fn float(value: &mysql::Value) -> Result<f64> {
    use mysql::Value as My;
    match value {
        My::Int(i) => Ok(*i as f64),
        My::UInt(u) => Ok(*u as f64),
        My::Float(f) => Ok(f64::from(*f)),
        My::Double(d) => Ok(*d),
        My::Bytes(b) => {
            let text = String::from_utf8_lossy(b);
            text.trim()
                .parse()
                .map_err(|_| SqlError::parse(text.as_ref(), "double"))
        }
        other => Err(SqlError::parse(other.as_sql(true), "double")),
    }
}

/// Protocol value sent for a bound parameter.
pub fn encode(value: &Value) -> mysql::Value {
    match value {
        Value::None | Value::Null => mysql::Value::NULL,
        Value::String(s) => mysql::Value::Bytes(s.as_bytes().to_vec()),
        Value::Blob(b) => mysql::Value::Bytes(b.clone()),
        Value::Bool(b) => mysql::Value::Int(i64::from(*b)),
        Value::Int(i) => mysql::Value::Int(i64::from(*i)),
        Value::Int64(i) => mysql::Value::Int(*i),
        Value::Double(d) => mysql::Value::Double(*d),
    }
}
