//! Storage types and their conversion rules.
//!
//! Every scalar field declares a `StorageType`. Hydration converts the raw
//! column value through [`StorageType::convert`]; the writer and the query
//! builder go the other way through [`StorageType::to_raw`].

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::value::{RawValue, Value};

/// Declared storage type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    Integer,
    SmallInt,
    BigInt,
    Boolean,
    Float,
    Decimal,
    String,
    Text,
    Guid,
    Date,
    DateTime,
    Json,
    Blob,
}

impl StorageType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::SmallInt => "smallint",
            Self::BigInt => "bigint",
            Self::Boolean => "boolean",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Text => "text",
            Self::Guid => "guid",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Json => "json",
            Self::Blob => "blob",
        }
    }

    /// Convert a raw column value into the typed value for this storage type.
    ///
    /// `NULL` converts to [`Value::Null`] for every type.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Conversion` if the raw value cannot represent
    /// this storage type.
    pub fn convert(self, raw: &RawValue) -> Result<Value, CoreError> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        match self {
            Self::Integer | Self::SmallInt | Self::BigInt => match raw {
                RawValue::Integer(n) => Ok(Value::Integer(*n)),
                RawValue::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|e| self.conversion_error(raw, e)),
                _ => Err(self.conversion_error(raw, "expected an integer")),
            },
            Self::Boolean => match raw {
                RawValue::Integer(0) => Ok(Value::Bool(false)),
                RawValue::Integer(1) => Ok(Value::Bool(true)),
                RawValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" => Ok(Value::Bool(true)),
                    "0" | "false" => Ok(Value::Bool(false)),
                    _ => Err(self.conversion_error(raw, "expected 0/1 or true/false")),
                },
                _ => Err(self.conversion_error(raw, "expected 0/1 or true/false")),
            },
            Self::Float => match raw {
                RawValue::Real(x) => Ok(Value::Float(*x)),
                #[allow(clippy::cast_precision_loss)]
                RawValue::Integer(n) => Ok(Value::Float(*n as f64)),
                RawValue::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|e| self.conversion_error(raw, e)),
                RawValue::Blob(_) | RawValue::Null => {
                    Err(self.conversion_error(raw, "expected a number"))
                }
            },
            Self::Decimal => match raw {
                RawValue::Integer(n) => Ok(Value::Decimal(n.to_string())),
                RawValue::Real(x) => Ok(Value::Decimal(x.to_string())),
                RawValue::Text(s) => {
                    let s = s.trim();
                    if s.parse::<f64>().is_ok() {
                        Ok(Value::Decimal(s.to_string()))
                    } else {
                        Err(self.conversion_error(raw, "not a decimal literal"))
                    }
                }
                RawValue::Blob(_) | RawValue::Null => {
                    Err(self.conversion_error(raw, "expected a decimal"))
                }
            },
            Self::String | Self::Text | Self::Guid => match raw {
                RawValue::Text(s) => Ok(Value::Text(s.clone())),
                RawValue::Integer(n) => Ok(Value::Text(n.to_string())),
                RawValue::Real(x) => Ok(Value::Text(x.to_string())),
                RawValue::Blob(b) => String::from_utf8(b.clone())
                    .map(Value::Text)
                    .map_err(|e| self.conversion_error(raw, e)),
                RawValue::Null => Ok(Value::Null),
            },
            Self::Date => match raw {
                RawValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .map(Value::Date)
                    .map_err(|e| self.conversion_error(raw, e)),
                _ => Err(self.conversion_error(raw, "expected a date string")),
            },
            Self::DateTime => match raw {
                RawValue::Text(s) => parse_datetime(s)
                    .map(Value::DateTime)
                    .map_err(|reason| self.conversion_error(raw, reason)),
                RawValue::Integer(secs) => DateTime::from_timestamp(*secs, 0)
                    .map(Value::DateTime)
                    .ok_or_else(|| self.conversion_error(raw, "timestamp out of range")),
                _ => Err(self.conversion_error(raw, "expected a datetime string")),
            },
            Self::Json => match raw {
                RawValue::Text(s) => serde_json::from_str(s)
                    .map(Value::Json)
                    .map_err(|e| self.conversion_error(raw, e)),
                RawValue::Blob(b) => serde_json::from_slice(b)
                    .map(Value::Json)
                    .map_err(|e| self.conversion_error(raw, e)),
                _ => Err(self.conversion_error(raw, "expected JSON text")),
            },
            Self::Blob => match raw {
                RawValue::Blob(b) => Ok(Value::Bytes(b.clone())),
                RawValue::Text(s) => Ok(Value::Bytes(s.clone().into_bytes())),
                _ => Err(self.conversion_error(raw, "expected a blob")),
            },
        }
    }

    /// Convert a typed value back into its storage representation.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Conversion` if the value's variant does not fit
    /// this storage type.
    pub fn to_raw(self, value: &Value) -> Result<RawValue, CoreError> {
        let mismatch = || CoreError::Conversion {
            storage_type: self,
            raw: format!("{value:?}"),
            reason: "value does not match the declared storage type".to_string(),
        };
        Ok(match (self, value) {
            (_, Value::Null) => RawValue::Null,
            (Self::Integer | Self::SmallInt | Self::BigInt, Value::Integer(n)) => {
                RawValue::Integer(*n)
            }
            (Self::Boolean, Value::Bool(b)) => RawValue::Integer(i64::from(*b)),
            (Self::Float, Value::Float(x)) => RawValue::Real(*x),
            #[allow(clippy::cast_precision_loss)]
            (Self::Float, Value::Integer(n)) => RawValue::Real(*n as f64),
            (Self::Decimal, Value::Decimal(s) | Value::Text(s)) => RawValue::Text(s.clone()),
            (Self::Decimal, Value::Integer(n)) => RawValue::Text(n.to_string()),
            (Self::String | Self::Text | Self::Guid, Value::Text(s)) => RawValue::Text(s.clone()),
            (Self::Date, Value::Date(d)) => RawValue::Text(d.format("%Y-%m-%d").to_string()),
            (Self::DateTime, Value::DateTime(dt)) => {
                RawValue::Text(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            (Self::Json, Value::Json(v)) => RawValue::Text(v.to_string()),
            (Self::Blob, Value::Bytes(b)) => RawValue::Blob(b.clone()),
            _ => return Err(mismatch()),
        })
    }

    fn conversion_error(self, raw: &RawValue, reason: impl fmt::Display) -> CoreError {
        CoreError::Conversion {
            storage_type: self,
            raw: raw.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort raw form of a value whose storage type is unknown.
///
/// Used to bind query parameters for criteria on identifiers and join
/// columns, where only the value itself is available.
#[must_use]
pub fn value_to_raw(value: &Value) -> RawValue {
    match value {
        Value::Null => RawValue::Null,
        Value::Bool(b) => RawValue::Integer(i64::from(*b)),
        Value::Integer(n) => RawValue::Integer(*n),
        Value::Float(x) => RawValue::Real(*x),
        Value::Decimal(s) | Value::Text(s) => RawValue::Text(s.clone()),
        Value::Bytes(b) => RawValue::Blob(b.clone()),
        Value::Date(d) => RawValue::Text(d.format("%Y-%m-%d").to_string()),
        Value::DateTime(dt) => RawValue::Text(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Json(v) => RawValue::Text(v.to_string()),
    }
}

/// Typed value of a raw scalar whose storage type is unknown.
#[must_use]
pub fn raw_to_value(raw: &RawValue) -> Value {
    match raw {
        RawValue::Null => Value::Null,
        RawValue::Integer(n) => Value::Integer(*n),
        RawValue::Real(x) => Value::Float(*x),
        RawValue::Text(s) => Value::Text(s.clone()),
        RawValue::Blob(b) => Value::Bytes(b.clone()),
    }
}

/// Parse a datetime in RFC 3339 or `SQLite`'s default `%Y-%m-%d %H:%M:%S` form.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("failed to parse datetime '{s}': {e}"))
}
