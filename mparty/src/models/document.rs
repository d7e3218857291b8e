//! Typed access to stored key-value documents.

use crate::store::Document;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while decoding a stored document into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} has the wrong type, expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Unknown value for {field}: {value}")]
    UnknownVariant { field: &'static str, value: String },
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Read-only view over a document; `null` reads as absent
pub(crate) struct Fields<'a> {
    doc: &'a Document,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        self.doc.get(field).filter(|v| !v.is_null())
    }

    pub(crate) fn required_str(&self, field: &'static str) -> DecodeResult<String> {
        self.optional_str(field)?
            .ok_or(DecodeError::MissingField(field))
    }

    pub(crate) fn optional_str(&self, field: &'static str) -> DecodeResult<Option<String>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(DecodeError::WrongType {
                field,
                expected: "string",
            }),
        }
    }

    /// First present field among `fields`, for renamed keys
    pub(crate) fn optional_str_any(&self, fields: &[&'static str]) -> DecodeResult<Option<String>> {
        for field in fields {
            if let Some(value) = self.optional_str(field)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    pub(crate) fn optional_count(&self, field: &'static str) -> DecodeResult<Option<u32>> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        let wrong = DecodeError::WrongType {
            field,
            expected: "non-negative integer",
        };
        let n = match value.as_u64() {
            Some(n) => n,
            // Some SDKs write whole numbers as doubles
            None => match value.as_f64() {
                Some(f) if f >= 0.0 && f.fract() == 0.0 => f as u64,
                _ => return Err(wrong),
            },
        };
        u32::try_from(n).map(Some).map_err(|_| wrong)
    }

    pub(crate) fn count_or(&self, field: &'static str, default: u32) -> DecodeResult<u32> {
        Ok(self.optional_count(field)?.unwrap_or(default))
    }

    pub(crate) fn required_count(&self, field: &'static str) -> DecodeResult<u32> {
        self.optional_count(field)?
            .ok_or(DecodeError::MissingField(field))
    }

    pub(crate) fn optional_f64(&self, field: &'static str) -> DecodeResult<Option<f64>> {
        match self.get(field) {
            None => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or(DecodeError::WrongType {
                field,
                expected: "number",
            }),
        }
    }

    pub(crate) fn bool_or(&self, field: &'static str, default: bool) -> DecodeResult<bool> {
        match self.get(field) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(DecodeError::WrongType {
                field,
                expected: "bool",
            }),
        }
    }

    pub(crate) fn required_datetime(&self, field: &'static str) -> DecodeResult<DateTime<Utc>> {
        let raw = self.required_str(field)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| DecodeError::WrongType {
                field,
                expected: "RFC 3339 timestamp",
            })
    }
}

/// `Some(v)` as the value, `None` as an explicit null
pub(crate) fn nullable<T: Into<Value>>(value: Option<T>) -> Value {
    value.map_or(Value::Null, Into::into)
}

/// Canonical timestamp encoding; sorts lexicographically in time order
pub(crate) fn timestamp(value: &DateTime<Utc>) -> Value {
    Value::String(value.to_rfc3339_opts(SecondsFormat::Secs, true))
}
