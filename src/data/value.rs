//! The dynamically typed value carried by tuples and result rows.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StreamqlError, StreamqlResult};

/// A named-value row: the payload of a tuple and the shape of a result row.
pub type Map = HashMap<String, Value>;

/// A single value flowing through a continuous query.
///
/// Equality is structural over the whole tree: two maps are equal when they
/// hold the same keys with deeply equal values. There is no numeric
/// coercion (`Int(1) != Float(1.0)`) and `NaN` never equals itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Blob(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Array(Vec<Value>),
    Map(Map),
}

/// Type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Null,
    Bool,
    Int,
    Float,
    String,
    Blob,
    Timestamp,
    Array,
    Map,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Blob => "blob",
            ValueType::Timestamp => "timestamp",
            ValueType::Array => "array",
            ValueType::Map => "map",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Blob(_) => ValueType::Blob,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Array(_) => ValueType::Array,
            Value::Map(_) => ValueType::Map,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn type_mismatch(&self, expected: ValueType) -> StreamqlError {
        StreamqlError::TypeError(format!(
            "expected {} but got {}",
            expected,
            self.value_type()
        ))
    }

    /// Strict accessor: only succeeds for `Value::Bool`.
    pub fn as_bool(&self) -> StreamqlResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.type_mismatch(ValueType::Bool)),
        }
    }

    pub fn as_int(&self) -> StreamqlResult<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(other.type_mismatch(ValueType::Int)),
        }
    }

    pub fn as_float(&self) -> StreamqlResult<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            other => Err(other.type_mismatch(ValueType::Float)),
        }
    }

    pub fn as_str(&self) -> StreamqlResult<&str> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(other.type_mismatch(ValueType::String)),
        }
    }

    pub fn as_blob(&self) -> StreamqlResult<&[u8]> {
        match self {
            Value::Blob(b) => Ok(b),
            other => Err(other.type_mismatch(ValueType::Blob)),
        }
    }

    pub fn as_timestamp(&self) -> StreamqlResult<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Ok(*t),
            other => Err(other.type_mismatch(ValueType::Timestamp)),
        }
    }

    pub fn as_array(&self) -> StreamqlResult<&[Value]> {
        match self {
            Value::Array(a) => Ok(a),
            other => Err(other.type_mismatch(ValueType::Array)),
        }
    }

    pub fn as_map(&self) -> StreamqlResult<&Map> {
        match self {
            Value::Map(m) => Ok(m),
            other => Err(other.type_mismatch(ValueType::Map)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json: serde_json::Value = self.clone().into();
        write!(f, "{}", json)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::Array(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            // JSON has no representation for NaN or infinities
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Blob(b) => {
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            Value::Timestamp(t) => {
                serde_json::Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Array(a) => {
                serde_json::Value::Array(a.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(m) => serde_json::Value::Object(
                m.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Build a [`Map`] from a JSON object literal.
///
/// Non-object JSON yields an empty map.
pub fn map_from_json(json: serde_json::Value) -> Map {
    match Value::from(json) {
        Value::Map(m) => m,
        _ => Map::new(),
    }
}
