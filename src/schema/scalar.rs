//! Scalar types: validation and application/store coercion per kind.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::element::Value;

/// The scalar kind a property holds.
///
/// Every validator accepts `Null`; rejecting absent values is the job of the
/// property's `nullable` flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    String { max_len: usize },
    Url { max_len: usize },
    Integer,
    Float,
    Boolean,
    /// Stored as an RFC 3339 string.
    DateTime,
    List,
    Dict,
}

impl ScalarType {
    pub fn string(max_len: usize) -> Self { ScalarType::String { max_len } }
    pub fn url(max_len: usize) -> Self { ScalarType::Url { max_len } }

    /// Multi-valued kinds are unique per node rather than graph-wide.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, ScalarType::List | ScalarType::Dict)
    }

    pub fn validate(&self, value: &Value) -> Result<(), Vec<String>> {
        if value.is_null() {
            return Ok(());
        }
        let mut errors = Vec::new();
        match (self, value) {
            (ScalarType::String { max_len }, Value::String(s)) => {
                check_length(s, *max_len, &mut errors);
            }
            (ScalarType::Url { max_len }, Value::String(s)) => {
                check_length(s, *max_len, &mut errors);
                match s.split_once("://") {
                    Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => {}
                    _ => errors.push(format!("'{s}' is not an absolute URL.")),
                }
            }
            (ScalarType::Integer, Value::Int(_))
            | (ScalarType::Float, Value::Float(_) | Value::Int(_))
            | (ScalarType::Boolean, Value::Bool(_))
            | (ScalarType::DateTime, Value::DateTime(_))
            | (ScalarType::List, Value::List(_))
            | (ScalarType::Dict, Value::Map(_)) => {}
            (ScalarType::DateTime, Value::String(s)) => {
                if DateTime::parse_from_rfc3339(s).is_err() {
                    errors.push(format!("'{s}' is not an RFC 3339 timestamp."));
                }
            }
            (expected, got) => {
                errors.push(format!("Expected {expected}, got {}.", got.type_name()));
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Application value → store value.
    pub fn to_db(&self, value: &Value) -> Result<Value, String> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (ScalarType::DateTime, Value::DateTime(dt)) => Ok(Value::String(dt.to_rfc3339())),
            (ScalarType::DateTime, Value::String(s)) => parse_datetime(s)
                .map(|dt| Value::String(dt.to_rfc3339())),
            (ScalarType::Float, Value::Int(i)) => Ok(Value::Float(*i as f64)),
            _ => self.validate(value).map(|()| value.clone()).map_err(|e| e.join(" ")),
        }
    }

    /// Store value → application value.
    pub fn to_py(&self, value: &Value) -> Result<Value, String> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (ScalarType::DateTime, Value::String(s)) => parse_datetime(s).map(Value::DateTime),
            (ScalarType::Float, Value::Int(i)) => Ok(Value::Float(*i as f64)),
            _ => self.validate(value).map(|()| value.clone()).map_err(|e| e.join(" ")),
        }
    }
}

fn check_length(s: &str, max_len: usize, errors: &mut Vec<String>) {
    let len = s.chars().count();
    if len > max_len {
        errors.push(format!("Length {len} exceeds maximum of {max_len}."));
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("'{s}' is not an RFC 3339 timestamp: {e}"))
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::String { max_len } => write!(f, "String({max_len})"),
            ScalarType::Url { max_len } => write!(f, "Url({max_len})"),
            ScalarType::Integer => write!(f, "Integer"),
            ScalarType::Float => write!(f, "Float"),
            ScalarType::Boolean => write!(f, "Boolean"),
            ScalarType::DateTime => write!(f, "DateTime"),
            ScalarType::List => write!(f, "List"),
            ScalarType::Dict => write!(f, "Dict"),
        }
    }
}
