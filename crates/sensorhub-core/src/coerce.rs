//! Lenient coercion of decoded JSON values.
//!
//! Payload producers on the boat are not consistent about types: the same
//! temperature might arrive as `300.15` on one bus and `"300.15"` on another.
//! Every domain decoder goes through the functions here instead of matching
//! on [`serde_json::Value`] directly.
//!
//! The accepted representations are closed: a value is first lifted into a
//! [`Scalar`] (float, signed, unsigned or text) and anything else is rejected.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Layout of the timestamps carried in leaf-measurement payloads,
/// e.g. `2025-01-01T12:00:00.000Z`.
pub const ISO_MILLIS_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Errors raised when a value cannot be coerced into the requested type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoerceError {
    /// The value has a shape that can never be a scalar (bool, null, array, object).
    #[error("can't convert {found} to a number")]
    Unsupported { found: &'static str },

    /// A string that does not parse as a number.
    #[error("'{0}' is not a number")]
    NotNumeric(String),

    /// An unsigned value too large for `i64`.
    #[error("{0} does not fit in a signed 64-bit integer")]
    OutOfRange(u64),

    #[error("expected a string, found {found}")]
    NotString { found: &'static str },

    #[error("expected an object, found {found}")]
    NotObject { found: &'static str },
}

/// The closed set of scalar representations a sensor may publish.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Float(f64),
    Signed(i64),
    Unsigned(u64),
    Text(String),
}

impl Scalar {
    /// Lift a JSON value into a scalar.
    pub fn from_json(value: &Value) -> Result<Self, CoerceError> {
        match value {
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Ok(Scalar::Unsigned(u))
                } else if let Some(i) = n.as_i64() {
                    Ok(Scalar::Signed(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Scalar::Float(f))
                } else {
                    Err(CoerceError::Unsupported { found: "number" })
                }
            }
            Value::String(s) => Ok(Scalar::Text(s.clone())),
            other => Err(CoerceError::Unsupported {
                found: kind_of(other),
            }),
        }
    }

    pub fn to_f64(&self) -> Result<f64, CoerceError> {
        match self {
            Scalar::Float(f) => Ok(*f),
            Scalar::Signed(i) => Ok(*i as f64),
            Scalar::Unsigned(u) => Ok(*u as f64),
            Scalar::Text(s) => s
                .parse::<f64>()
                .map_err(|_| CoerceError::NotNumeric(s.clone())),
        }
    }

    /// Integer view. Floats are truncated toward zero.
    pub fn to_i64(&self) -> Result<i64, CoerceError> {
        match self {
            Scalar::Float(f) => Ok(f.trunc() as i64),
            Scalar::Signed(i) => Ok(*i),
            Scalar::Unsigned(u) => i64::try_from(*u).map_err(|_| CoerceError::OutOfRange(*u)),
            Scalar::Text(s) => match s.parse::<i64>() {
                Ok(i) => Ok(i),
                Err(_) => Scalar::Float(self.to_f64()?).to_i64(),
            },
        }
    }
}

macro_rules! scalar_from {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for Scalar {
                fn from(v: $source) -> Self {
                    Scalar::$variant(v as $target)
                }
            }
        )+
    };
}

scalar_from!(Signed as i64: i8, i16, i32, i64, isize);
scalar_from!(Unsigned as u64: u8, u16, u32, u64, usize);
scalar_from!(Float as f64: f32, f64);

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// Coerce to `f64`. Accepts any JSON number and numeric strings.
pub fn parse_f64(value: &Value) -> Result<f64, CoerceError> {
    Scalar::from_json(value)?.to_f64()
}

/// Coerce to `i64`, truncating fractional values.
pub fn parse_i64(value: &Value) -> Result<i64, CoerceError> {
    Scalar::from_json(value)?.to_i64()
}

/// Succeeds only for JSON strings.
pub fn parse_string(value: &Value) -> Result<String, CoerceError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(CoerceError::NotString {
            found: kind_of(other),
        }),
    }
}

/// Succeeds only for JSON objects (compound values like `position`).
pub fn parse_map(value: &Value) -> Result<&Map<String, Value>, CoerceError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CoerceError::NotObject {
            found: kind_of(other),
        }),
    }
}

/// Parse a leaf-payload timestamp (`2025-01-01T12:00:00.000Z`).
///
/// The fraction must be exactly three digits or absent; a timestamp
/// without one is read as whole seconds rather than rejected.
pub fn parse_iso_millis(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, ISO_MILLIS_LAYOUT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// serde helpers for flat payloads
// ============================================================================
//
// Flat payloads are deserialized straight into their record struct. These
// keep one badly typed field from failing the whole message: the field is
// logged and left at its zero value.

pub fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(0.0);
    }
    Ok(parse_f64(&value).unwrap_or_else(|e| {
        warn!("Ignoring field value {}: {}", value, e);
        0.0
    }))
}

pub fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(0);
    }
    Ok(parse_i64(&value).unwrap_or_else(|e| {
        warn!("Ignoring field value {}: {}", value, e);
        0
    }))
}

pub fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(String::new());
    }
    Ok(parse_string(&value).unwrap_or_else(|e| {
        warn!("Ignoring field value {}: {}", value, e);
        String::new()
    }))
}

/// Booleans may arrive as `true`, `"true"`, or `1`.
pub fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Null => Some(false),
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(_) => parse_f64(&value).ok().map(|n| n != 0.0),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(|| {
        warn!("Ignoring field value {}: not a boolean", value);
        false
    }))
}

/// RFC 3339 or the leaf-payload layout; anything else becomes `None`.
pub fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(None),
        Value::String(s) => {
            let parsed = DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| parse_iso_millis(s));
            if parsed.is_none() {
                warn!("Error parsing time string: {}", s);
            }
            Ok(parsed)
        }
        other => {
            warn!("Ignoring timestamp {}: expected a string", other);
            Ok(None)
        }
    }
}
