//! PostgreSQL type mapping.
//!
//! Result columns are decoded by OID into [`Value`]s. Parameters are sent in
//! binary format, coerced to the type the server inferred for each `$N`.

use std::error::Error;
use std::str::FromStr;

use bytes::BytesMut;
use postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use postgres::Row as PgNativeRow;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::core::{Value, ValueType};
use crate::error::{Result, SqlError};

/// Column type of a PostgreSQL type.
pub fn value_type_for(ty: &Type) -> ValueType {
    match *ty {
        Type::BOOL => ValueType::Bool,
        Type::INT2 | Type::INT4 => ValueType::Int,
        Type::INT8 => ValueType::Int64,
        Type::FLOAT4 | Type::FLOAT8 | Type::NUMERIC => ValueType::Double,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::CHAR => ValueType::String,
        Type::BYTEA => ValueType::Blob,
        _ => ValueType::Unsupported,
    }
}

/// Decode column `idx` of a fetched row.
///
/// Unsupported types decode to [`Value::None`].
pub(crate) fn decode_column(row: &PgNativeRow, idx: usize) -> Result<Value> {
    let ty = row.columns()[idx].type_().clone();
    let value = match ty {
        Type::BOOL => get::<bool>(row, idx)?.map(Value::Bool),
        Type::INT2 => get::<i16>(row, idx)?.map(|v| Value::Int(i32::from(v))),
        Type::INT4 => get::<i32>(row, idx)?.map(Value::Int),
        Type::INT8 => get::<i64>(row, idx)?.map(Value::Int64),
        Type::FLOAT4 => get::<f32>(row, idx)?.map(|v| Value::Double(f64::from(v))),
        Type::FLOAT8 => get::<f64>(row, idx)?.map(Value::Double),
        Type::NUMERIC => get::<Decimal>(row, idx)?
            .map(|d| Value::Double(d.to_f64().unwrap_or(f64::NAN))),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            get::<String>(row, idx)?.map(Value::String)
        }
        // The single-byte "char" type.
        Type::CHAR => get::<i8>(row, idx)?.map(|c| Value::String(char::from(c as u8).to_string())),
        Type::BYTEA => get::<Vec<u8>>(row, idx)?.map(Value::Blob),
        _ => return Ok(Value::None),
    };
    Ok(value.unwrap_or(Value::Null))
}

fn get<'a, T>(row: &'a PgNativeRow, idx: usize) -> Result<Option<T>>
where
    T: postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| SqlError::fetch("22000", e.to_string()))
}

/// Decode the text form of a bytea: hex (`\x0102`) or escape (`\001\\`).
pub fn decode_bytea_text(text: &str) -> Result<Vec<u8>> {
    let invalid = || SqlError::parse(text, "bytea");

    if let Some(digits) = text.strip_prefix("\\x").or_else(|| text.strip_prefix("\\X")) {
        let digits: String = digits.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        return hex::decode(digits).map_err(|_| invalid());
    }

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
        } else if bytes.get(i + 1) == Some(&b'\\') {
            out.push(b'\\');
            i += 2;
        } else {
            let octal = bytes.get(i + 1..i + 4).ok_or_else(invalid)?;
            if !octal.iter().all(|b| (b'0'..=b'7').contains(b)) {
                return Err(invalid());
            }
            let value = octal
                .iter()
                .fold(0u16, |acc, b| acc * 8 + u16::from(b - b'0'));
            out.push(u8::try_from(value).map_err(|_| invalid())?);
            i += 4;
        }
    }
    Ok(out)
}

/// A bound [`Value`] encoded for the parameter type the server inferred.
#[derive(Debug)]
pub(crate) struct PgParam<'a> {
    pub(crate) value: &'a Value,
}

impl ToSql for PgParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        let value = self.value;
        if value.is_empty() {
            return Ok(IsNull::Yes);
        }
        match *ty {
            Type::BOOL => value.to_bool().to_sql(ty, out),
            Type::INT2 => i16::try_from(value.to_int64()?)?.to_sql(ty, out),
            Type::INT4 => i32::try_from(value.to_int64()?)?.to_sql(ty, out),
            Type::INT8 => value.to_int64()?.to_sql(ty, out),
            Type::FLOAT4 => (value.to_double()? as f32).to_sql(ty, out),
            Type::FLOAT8 => value.to_double()?.to_sql(ty, out),
            Type::NUMERIC => numeric(value)?.to_sql(ty, out),
            Type::BYTEA => match value {
                Value::String(s) if s.starts_with('\\') => decode_bytea_text(s)?.to_sql(ty, out),
                other => other.to_blob().to_sql(ty, out),
            },
            Type::CHAR => (value.to_text().bytes().next().unwrap_or(0) as i8).to_sql(ty, out),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                value.to_text().to_sql(ty, out)
            }
            _ => Err(format!(
                "cannot bind {} to a parameter of type {}; cast the parameter in SQL",
                value.value_type(),
                ty
            )
            .into()),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn numeric(value: &Value) -> Result<Decimal> {
    match value {
        Value::Bool(b) => Ok(Decimal::from(i64::from(*b))),
        Value::Int(i) => Ok(Decimal::from(*i)),
        Value::Int64(i) => Ok(Decimal::from(*i)),
        Value::Double(d) => {
            Decimal::try_from(*d).map_err(|_| SqlError::parse(d.to_string(), "numeric"))
        }
        other => {
            let text = other.to_text();
            Decimal::from_str(text.trim()).map_err(|_| SqlError::parse(text, "numeric"))
        }
    }
}
