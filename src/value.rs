//! Value types shared by point fields and query result rows.

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;

use crate::precision::Precision;

/// A single scalar value on the wire.
///
/// Point fields are written from this type and result rows are decoded into it.
/// Every JSON number in a row decodes as `Float`, so a column keeps one type even
/// when the server writes `5.0` as `5`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    /// Null value. Appears in rows; cannot be written as a field.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed 64-bit integer.
    Integer(i64),

    /// 64-bit floating point value.
    Float(OrderedFloat<f64>),

    /// String value.
    String(String),
}

impl Value {
    /// Returns the value as a string slice if it is a `String` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a f64. Integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(f.into_inner()),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the value as an i64 if it is an `Integer` variant.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a bool if it is a `Bool` variant.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interprets the value as a timestamp.
    ///
    /// Strings are parsed as RFC3339 with optional fractional seconds. Numbers
    /// count `epoch` units since 1970-01-01T00:00:00Z. Anything else, or a value
    /// that does not parse, yields `None`.
    pub fn as_timestamp(&self, epoch: Precision) -> Option<DateTime<Utc>> {
        match self {
            Value::String(s) => parse_rfc3339(s),
            Value::Integer(i) => scale_integer(*i, epoch),
            Value::Float(f) => scale_float(f.into_inner(), epoch),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                Value::Float(OrderedFloat(n.as_f64().unwrap_or(f64::NAN)))
            }
            serde_json::Value::String(s) => Value::String(s),
            // Rows never nest; keep the raw JSON text rather than dropping it.
            other => Value::String(other.to_string()),
        }
    }
}

/// Reads a raw JSON cell as a timestamp.
///
/// Integral numbers are scaled without going through `f64`, so nanosecond
/// epochs stay exact.
pub(crate) fn json_timestamp(v: &serde_json::Value, epoch: Precision) -> Option<DateTime<Utc>> {
    match v {
        serde_json::Value::String(s) => parse_rfc3339(s),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => scale_integer(i, epoch),
            None => scale_float(n.as_f64()?, epoch),
        },
        _ => None,
    }
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn scale_integer(i: i64, epoch: Precision) -> Option<DateTime<Utc>> {
    i.checked_mul(epoch.nanos())
        .map(DateTime::from_timestamp_nanos)
}

fn scale_float(f: f64, epoch: Precision) -> Option<DateTime<Utc>> {
    let scaled = f * epoch.nanos() as f64;
    if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(DateTime::from_timestamp_nanos(scaled as i64))
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(OrderedFloat(f64::from(v)))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
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

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}
