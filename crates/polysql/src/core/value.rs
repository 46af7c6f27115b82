//! Dynamically-typed column values.
//!
//! [`Value`] is the engine-independent representation of one column's content.
//! Every driver adapter translates its native cells into a `Value` and every
//! bound parameter goes through one.
//!
//! # Conversions
//!
//! The `to_*` methods are total: any alternative converts to any requested
//! scalar type. The single failure case is parsing a string as a number, which
//! returns [`SqlError::Parse`]. The `*_opt` variants return `None` for null and
//! absent values.
//!
//! There are two distinct blob to string paths:
//!
//! - [`Value::to_text`] is value coercion and reinterprets the raw bytes,
//! - [`Display`](std::fmt::Display) (and therefore `to_string()`) is display
//!   formatting and renders blobs as lowercase hex.
//!
//! ```rust
//! use polysql::core::Value;
//!
//! let blob = Value::Blob(vec![0x01, 0x02]);
//! assert_eq!(blob.to_string(), "0102");
//!
//! let text = Value::Blob(b"abc".to_vec());
//! assert_eq!(text.to_text(), "abc");
//! ```

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{Result, SqlError};

/// Raw byte sequence column content.
pub type Blob = Vec<u8>;

/// Column type as reported by result metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    /// No type information (unset slot).
    None,
    /// The SQL NULL type.
    NullValue,
    String,
    Blob,
    Bool,
    Int,
    Int64,
    Double,
    /// The engine type has no counterpart in [`Value`].
    Unsupported,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::None => "NONE",
            ValueType::NullValue => "NULL_VALUE",
            ValueType::String => "STRING",
            ValueType::Blob => "BLOB",
            ValueType::Bool => "BOOL",
            ValueType::Int => "INT",
            ValueType::Int64 => "INT64",
            ValueType::Double => "DOUBLE",
            ValueType::Unsupported => "UNSUPPORTED",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single column value.
///
/// `None` is the absent alternative: a slot that was never assigned, such as
/// an unbound parameter. It converts like `Null` but is not null.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Null,
    String(String),
    Blob(Blob),
    Bool(bool),
    Int(i32),
    Int64(i64),
    Double(f64),
}

impl Value {
    /// The type tag of the active alternative.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::None => ValueType::None,
            Value::Null => ValueType::NullValue,
            Value::String(_) => ValueType::String,
            Value::Blob(_) => ValueType::Blob,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Int64(_) => ValueType::Int64,
            Value::Double(_) => ValueType::Double,
        }
    }

    /// True only for SQL NULL; an absent value is not null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for a never-assigned slot.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::None)
    }

    /// True when the value carries no data (null or absent).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::None | Value::Null)
    }

    /// Value coercion to a string. Blobs are reinterpreted as UTF-8 text.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Value::None | Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
        }
    }

    #[must_use]
    pub fn to_blob(&self) -> Blob {
        match self {
            Value::None | Value::Null => Blob::new(),
            Value::Blob(b) => b.clone(),
            Value::String(s) => s.as_bytes().to_vec(),
            other => other.to_text().into_bytes(),
        }
    }

    #[must_use]
    pub fn to_bool(&self) -> bool {
        match self {
            Value::None | Value::Null => false,
            Value::String(s) => parse_bool(s),
            Value::Blob(b) => !b.is_empty(),
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Int64(i) => *i != 0,
            Value::Double(d) => *d != 0.0,
        }
    }

    pub fn to_int(&self) -> Result<i32> {
        Ok(match self {
            Value::None | Value::Null => 0,
            Value::String(s) => parse_number(s, "int")?,
            Value::Blob(b) => parse_number(&String::from_utf8_lossy(b), "int")?,
            Value::Bool(b) => i32::from(*b),
            Value::Int(i) => *i,
            Value::Int64(i) => *i as i32,
            Value::Double(d) => *d as i32,
        })
    }

    pub fn to_int64(&self) -> Result<i64> {
        Ok(match self {
            Value::None | Value::Null => 0,
            Value::String(s) => parse_number(s, "int64")?,
            Value::Blob(b) => parse_number(&String::from_utf8_lossy(b), "int64")?,
            Value::Bool(b) => i64::from(*b),
            Value::Int(i) => i64::from(*i),
            Value::Int64(i) => *i,
            Value::Double(d) => *d as i64,
        })
    }

    pub fn to_double(&self) -> Result<f64> {
        Ok(match self {
            Value::None | Value::Null => 0.0,
            Value::String(s) => parse_number(s, "double")?,
            Value::Blob(b) => parse_number(&String::from_utf8_lossy(b), "double")?,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Int(i) => f64::from(*i),
            Value::Int64(i) => *i as f64,
            Value::Double(d) => *d,
        })
    }

    #[must_use]
    pub fn to_text_opt(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_text())
    }

    #[must_use]
    pub fn to_blob_opt(&self) -> Option<Blob> {
        (!self.is_empty()).then(|| self.to_blob())
    }

    #[must_use]
    pub fn to_bool_opt(&self) -> Option<bool> {
        (!self.is_empty()).then(|| self.to_bool())
    }

    pub fn to_int_opt(&self) -> Result<Option<i32>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.to_int().map(Some)
    }

    pub fn to_int64_opt(&self) -> Result<Option<i64>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.to_int64().map(Some)
    }

    pub fn to_double_opt(&self) -> Result<Option<f64>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.to_double().map(Some)
    }

    /// Typed extraction through [`FromValue`].
    ///
    /// ```rust
    /// use polysql::core::Value;
    ///
    /// let v = Value::from("42");
    /// assert_eq!(v.get::<i64>().unwrap(), 42);
    /// assert_eq!(Value::Null.get::<Option<i64>>().unwrap(), None);
    /// ```
    pub fn get<T: FromValue>(&self) -> Result<T> {
        T::from_value(self)
    }
}

/// Truthiness of a string: `true`, `on` or `1`, case-insensitive.
pub fn parse_bool(s: &str) -> bool {
    let s = s.trim();
    s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("on") || s == "1"
}

fn parse_number<T: std::str::FromStr>(s: &str, target: &'static str) -> Result<T> {
    s.trim().parse().map_err(|_| SqlError::parse(s, target))
}

/// Decode hex digits, with an optional `0x` prefix, into a blob.
pub fn decode_hex(text: &str) -> Result<Blob> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    hex::decode(digits).map_err(|_| SqlError::parse(text, "blob"))
}

/// Display formatting: blobs as lowercase hex, null as `NULL`, absent as "".
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Null => f.write_str("NULL"),
            Value::Blob(b) => f.write_str(&hex::encode(b)),
            Value::String(s) => f.write_str(s),
            other => f.write_str(&other.to_text()),
        }
    }
}

/// JSON-friendly serialization: blobs become hex strings, null and absent
/// both become `null`.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::None | Value::Null => serializer.serialize_none(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Blob(b) => serializer.serialize_str(&hex::encode(b)),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i32(*i),
            Value::Int64(i) => serializer.serialize_i64(*i),
            Value::Double(d) => serializer.serialize_f64(*d),
        }
    }
}

/// Conversion out of a [`Value`] into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.to_text())
    }
}

impl FromValue for Blob {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.to_blob())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.to_bool())
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        value.to_int()
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.to_int64()
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.to_double()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_empty() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

// From implementations used by the bind helpers
impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Blob> for Value {
    fn from(v: Blob) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_bool() {
        for truthy in ["true", "TRUE", "On", "1", " true "] {
            assert!(Value::from(truthy).to_bool(), "{truthy}");
        }
        for falsy in ["false", "off", "0", "yes", "", "2"] {
            assert!(!Value::from(falsy).to_bool(), "{falsy}");
        }
    }

    #[test]
    fn test_string_to_numbers() {
        let v = Value::from(" 42 ");
        assert_eq!(v.to_int().unwrap(), 42);
        assert_eq!(v.to_int64().unwrap(), 42);
        assert_eq!(Value::from("2.5").to_double().unwrap(), 2.5);
    }

    #[test]
    fn test_string_to_number_parse_error() {
        let err = Value::from("hello").to_int().unwrap_err();
        assert!(matches!(err, SqlError::Parse { target: "int", .. }));
        assert!(Value::from("1.5").to_int64().is_err());
        assert!(Value::from("abc").to_double_opt().is_err());
    }

    #[test]
    fn test_blob_conversions() {
        let blob = Value::Blob(vec![0x01, 0x02]);
        assert!(blob.to_bool());
        assert!(!Value::Blob(Vec::new()).to_bool());
        assert_eq!(blob.to_string(), "0102");
        assert_eq!(Value::Blob(b"Hello".to_vec()).to_text(), "Hello");
        assert_eq!(blob.to_blob(), vec![0x01, 0x02]);
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("0AFF").unwrap(), vec![10, 255]);
        assert_eq!(decode_hex("0x01").unwrap(), vec![1]);
        assert_eq!(decode_hex("").unwrap(), Vec::<u8>::new());
        assert!(matches!(
            decode_hex("123"),
            Err(SqlError::Parse { target: "blob", .. })
        ));
        assert!(decode_hex("zz").is_err());
        assert_eq!(Value::Blob(decode_hex("00ab").unwrap()).to_string(), "00ab");
    }

    #[test]
    fn test_bool_to_numbers() {
        assert_eq!(Value::Bool(true).to_int().unwrap(), 1);
        assert_eq!(Value::Bool(false).to_int64().unwrap(), 0);
        assert_eq!(Value::Bool(true).to_double().unwrap(), 1.0);
        assert_eq!(Value::Bool(true).to_text(), "true");
    }

    #[test]
    fn test_numeric_casts_without_overflow_checks() {
        assert_eq!(Value::Int64(1 << 32 | 7).to_int().unwrap(), 7);
        assert_eq!(Value::Double(3.9).to_int().unwrap(), 3);
        assert_eq!(Value::Int(-1).to_int64().unwrap(), -1);
        assert!(Value::Double(0.5).to_bool());
    }

    #[test]
    fn test_null_and_absent_defaults() {
        for v in [Value::Null, Value::None] {
            assert_eq!(v.to_text(), "");
            assert!(v.to_blob().is_empty());
            assert!(!v.to_bool());
            assert_eq!(v.to_int().unwrap(), 0);
            assert_eq!(v.to_int64().unwrap(), 0);
            assert_eq!(v.to_double().unwrap(), 0.0);
            assert_eq!(v.to_text_opt(), None);
            assert_eq!(v.to_blob_opt(), None);
            assert_eq!(v.to_bool_opt(), None);
            assert_eq!(v.to_int_opt().unwrap(), None);
            assert_eq!(v.to_int64_opt().unwrap(), None);
            assert_eq!(v.to_double_opt().unwrap(), None);
        }
        assert!(Value::Null.is_null());
        assert!(!Value::None.is_null());
        assert!(Value::None.is_absent());
    }

    #[test]
    fn test_opt_accessors_with_values() {
        assert_eq!(Value::Int(5).to_int_opt().unwrap(), Some(5));
        assert_eq!(Value::from("x").to_text_opt(), Some("x".to_string()));
        assert_eq!(Value::Bool(false).to_bool_opt(), Some(false));
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::None.to_string(), "");
        assert_eq!(Value::Int(7).to_string(), "7");
        assert_eq!(Value::Double(2.0).to_string(), "2");
        assert_eq!(Value::from("Alice").to_string(), "Alice");
        assert_eq!(Value::Blob(vec![0xde, 0xad, 0x0f]).to_string(), "dead0f");
    }

    #[test]
    fn test_value_type_tags() {
        assert_eq!(Value::None.value_type(), ValueType::None);
        assert_eq!(Value::Null.value_type(), ValueType::NullValue);
        assert_eq!(Value::Int64(1).value_type(), ValueType::Int64);
        assert_eq!(ValueType::NullValue.to_string(), "NULL_VALUE");
    }

    #[test]
    fn test_typed_get() {
        let v = Value::Int(12);
        assert_eq!(v.get::<String>().unwrap(), "12");
        assert_eq!(v.get::<f64>().unwrap(), 12.0);
        assert_eq!(v.get::<Option<i32>>().unwrap(), Some(12));
        assert_eq!(Value::None.get::<Option<String>>().unwrap(), None);
    }

    #[test]
    fn test_from_implementations() {
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(42i64), Value::Int64(42));
        assert_eq!(Value::from(()), Value::Null);
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::String("a".into()));
        assert_eq!(Value::from(&b"ab"[..]), Value::Blob(b"ab".to_vec()));
    }

    #[test]
    fn test_serialize_as_json() {
        let row = vec![Value::Int(1), Value::Blob(vec![0xff]), Value::Null];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[1,"ff",null]"#);
    }
}
