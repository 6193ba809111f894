//! Validation and coercion of untrusted request fields.
//!
//! Every function here is pure: a raw value goes in, a typed value or an
//! [`InvalidInput`] naming the field comes out.

use crate::domain::types::{Address, Hash};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// A field failed validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field}: {reason}")]
pub struct InvalidInput {
    /// Request field name
    pub field: String,
    /// What was expected
    pub reason: String,
}

impl InvalidInput {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Untyped request value as it arrives from a query string or JSON body
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Integer(i64),
    Text(String),
    Bytes(Vec<u8>),
    Instant(DateTime<Utc>),
    Other(Value),
}

impl From<Value> for RawValue {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => RawValue::Text(s),
            Value::Number(ref n) => match n.as_i64().or_else(|| integral(n.as_f64()?)) {
                Some(i) => RawValue::Integer(i),
                None => RawValue::Other(v),
            },
            other => RawValue::Other(other),
        }
    }
}

// `123.0` counts as an integer, `123.5` does not
fn integral(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

impl From<&Value> for RawValue {
    fn from(v: &Value) -> Self {
        RawValue::from(v.clone())
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Integer(i)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(b: Vec<u8>) -> Self {
        RawValue::Bytes(b)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(dt: DateTime<Utc>) -> Self {
        RawValue::Instant(dt)
    }
}

/// Target shape of a coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Str,
    Hash,
    Address,
    DateTime,
}

/// Result of coercing one raw value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedField {
    Integer(i64),
    Str(String),
    Hash(Hash),
    Address(Address),
    DateTime(DateTime<Utc>),
}

/// Coerce `raw` into the requested shape
pub fn coerce(field: &str, kind: FieldKind, raw: &RawValue) -> Result<ValidatedField, InvalidInput> {
    Ok(match kind {
        FieldKind::Integer => ValidatedField::Integer(be_integer(field, raw)?),
        FieldKind::Str => ValidatedField::Str(be_string(field, raw)?),
        FieldKind::Hash => ValidatedField::Hash(be_hash(field, raw)?),
        FieldKind::Address => ValidatedField::Address(be_address(field, raw)?),
        FieldKind::DateTime => ValidatedField::DateTime(be_datetime(field, raw)?),
    })
}

/// Integral values pass through; text is parsed as base 10.
pub fn be_integer(field: &str, raw: &RawValue) -> Result<i64, InvalidInput> {
    let not_integer = || InvalidInput::new(field, "Input needs to be an integer");
    match raw {
        RawValue::Integer(i) => Ok(*i),
        RawValue::Text(_) | RawValue::Bytes(_) => be_string(field, raw)
            .map_err(|_| not_integer())?
            .trim()
            .parse::<i64>()
            .map_err(|_| not_integer()),
        _ => Err(not_integer()),
    }
}

/// Text passes through; bytes are decoded as UTF-8.
pub fn be_string(field: &str, raw: &RawValue) -> Result<String, InvalidInput> {
    match raw {
        RawValue::Text(s) => Ok(s.clone()),
        RawValue::Bytes(b) => String::from_utf8(b.clone())
            .map_err(|_| InvalidInput::new(field, "Input is not valid UTF-8")),
        _ => Err(InvalidInput::new(field, "Input is not a string")),
    }
}

/// 32-byte hex hash, `0x` prefix optional on input, always present on output.
pub fn be_hash(field: &str, raw: &RawValue) -> Result<Hash, InvalidInput> {
    let s = be_string(field, raw)?;
    let digits = s.strip_prefix("0x").unwrap_or(&s);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(InvalidInput::new(field, "String is not a hash"));
    }
    if digits.len() != Hash::HEX_LEN {
        return Err(InvalidInput::new(
            field,
            format!(
                "Hash must be 64 hex characters (66 with 0x prefix), got {}",
                s.len()
            ),
        ));
    }

    Ok(Hash::from_digits(digits))
}

/// 20-byte account address in any letter case, normalized to lower case.
pub fn be_address(field: &str, raw: &RawValue) -> Result<Address, InvalidInput> {
    let s = be_string(field, raw)?;
    let digits = s.strip_prefix("0x").unwrap_or(&s);

    if digits.len() != Address::HEX_LEN || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(InvalidInput::new(
            field,
            "Address must be 40 hex characters, optionally 0x-prefixed",
        ));
    }

    Ok(Address::from_digits(digits))
}

// Tried in order after RFC 3339 and RFC 2822. Naive forms are read as UTC.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%d %B %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%d %B %Y", "%B %d, %Y", "%b %d %Y"];

/// Instants pass through, integers are Unix seconds, text is parsed
/// against a permissive set of calendar formats.
pub fn be_datetime(field: &str, raw: &RawValue) -> Result<DateTime<Utc>, InvalidInput> {
    match raw {
        RawValue::Instant(dt) => Ok(*dt),
        RawValue::Integer(secs) => Utc
            .timestamp_opt(*secs, 0)
            .single()
            .ok_or_else(|| InvalidInput::new(field, "Timestamp out of range")),
        RawValue::Text(_) | RawValue::Bytes(_) => {
            let text = be_string(field, raw)?;
            parse_datetime(text.trim()).map_err(|diagnostic| InvalidInput::new(field, diagnostic))
        }
        RawValue::Other(_) => Err(InvalidInput::new(field, "Input is not a date/time")),
    }
}

fn parse_datetime(text: &str) -> Result<DateTime<Utc>, String> {
    let rfc3339 = match DateTime::parse_from_rfc3339(text) {
        Ok(dt) => return Ok(dt.with_timezone(&Utc)),
        Err(e) => e,
    };

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&naive));
            }
        }
    }

    Err(format!("Unable to parse date/time {:?}: {}", text, rfc3339))
}
