//! URL encoding of request parameters.
//!
//! # Design
//! `ParamValue` is the closed set of values a query or path parameter may
//! hold, so most unsupported inputs are rejected by the type system. Values
//! arriving from dynamic sources go through `ParamValue::from_json`, which is
//! where objects and nested arrays are turned into `EncodeError`s.
//!
//! String encoding is idempotent: a valid `%XX` triplet is copied through
//! untouched, everything outside the RFC 3986 unreserved set is escaped. That
//! makes `encode("foo/bar")` and `encode("foo%2Fbar")` agree.

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::EncodeError;

/// Bytes escaped in a path or query segment: everything but `A-Z a-z 0-9 - . _ ~`.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Separator for list parameters.
const LIST_DELIMITER: &str = ",";

/// A scalar parameter value, or a delimited list of scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Date(DateTime<Utc>),
    /// Sent as the encoded items joined by `,`.
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Convert a dynamically typed JSON value. `null` means "absent".
    pub fn from_json(value: &serde_json::Value) -> Result<Option<Self>, EncodeError> {
        use serde_json::Value;

        let param = match value {
            Value::Null => return Ok(None),
            Value::Bool(b) => ParamValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ParamValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    ParamValue::UInt(u)
                } else if let Some(f) = n.as_f64() {
                    ParamValue::Float(f)
                } else {
                    return Err(EncodeError::UnsupportedType("number"));
                }
            }
            Value::String(s) => ParamValue::Str(s.clone()),
            Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Array(_) => return Err(EncodeError::UnsupportedType("nested list")),
                        Value::Null => continue,
                        other => list.extend(Self::from_json(other)?),
                    }
                }
                ParamValue::List(list)
            }
            Value::Object(_) => return Err(EncodeError::UnsupportedType("object")),
        };
        Ok(Some(param))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) | ParamValue::UInt(_) => "integer",
            ParamValue::Float(_) => "float",
            ParamValue::Str(_) => "string",
            ParamValue::Date(_) => "date",
            ParamValue::List(_) => "list",
        }
    }
}

/// Encode a parameter value for use in a URL path or query segment.
pub fn encode_param(value: &ParamValue) -> Result<String, EncodeError> {
    match value {
        ParamValue::Bool(b) => Ok(b.to_string()),
        ParamValue::Int(i) => Ok(i.to_string()),
        ParamValue::UInt(u) => Ok(u.to_string()),
        ParamValue::Float(f) if !f.is_finite() => {
            Err(EncodeError::UnsupportedType("non-finite float"))
        }
        ParamValue::Float(f) => Ok(f.to_string()),
        ParamValue::Str(s) => Ok(encode_str(s)),
        ParamValue::Date(d) => Ok(encode_str(&d.to_rfc3339_opts(SecondsFormat::Millis, true))),
        ParamValue::List(items) => {
            let mut encoded = Vec::with_capacity(items.len());
            for item in items {
                if let ParamValue::List(_) = item {
                    return Err(EncodeError::UnsupportedType("nested list"));
                }
                encoded.push(encode_param(item)?);
            }
            Ok(encoded.join(LIST_DELIMITER))
        }
    }
}

/// Percent-encode `s`, copying existing `%XX` escapes through unchanged.
pub fn encode_str(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && is_escape(&bytes[i..]) {
            out.extend(utf8_percent_encode(&s[start..i], SEGMENT));
            out.push_str(&s[i..i + 3]);
            i += 3;
            start = i;
        } else {
            i += 1;
        }
    }
    out.extend(utf8_percent_encode(&s[start..], SEGMENT));
    out
}

fn is_escape(bytes: &[u8]) -> bool {
    bytes.len() >= 3 && bytes[1].is_ascii_hexdigit() && bytes[2].is_ascii_hexdigit()
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for ParamValue {
            fn from(value: $t) -> Self {
                ParamValue::Int(i64::from(value))
            }
        }
    )*};
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for ParamValue {
            fn from(value: $t) -> Self {
                ParamValue::UInt(u64::from(value))
            }
        }
    )*};
}

from_signed!(i8, i16, i32, i64);
from_unsigned!(u8, u16, u32, u64);

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Float(f64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        ParamValue::Date(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}
