//! Result types returned by the transport.
//!
//! # Design
//! `ApiResult<T>` makes success and failure explicit in the return type: a
//! `Success` always carries the decoded value plus the `RawResponse` it came
//! from, a `Failure` carries an `ErrorInfo` and the `RawResponse` when one was
//! received. `RawResponse` bodies are reference counted, so attaching the same
//! response to a value and to its metadata does not copy the payload.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::error::{ErrorKind, TransportError};
use crate::mode::ResponseMode;

/// A response body after mode-driven decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Raw bytes: binary content, or text that failed to decode in unknown mode.
    Binary(Bytes),
    /// Valid UTF-8 text.
    Text(Arc<str>),
}

impl Body {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Binary(bytes) => bytes,
            Body::Text(text) => text.as_bytes(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Binary(_) => None,
            Body::Text(text) => Some(text),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_string_lossy(&self) -> String {
        match self {
            Body::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Body::Text(text) => text.to_string(),
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Text(text) => f.write_str(text),
            Body::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// The unprocessed outcome of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub ok: bool,
    pub status_code: u16,
    pub content_type: String,
    pub mode: ResponseMode,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        crate::http::find_header(&self.headers, name)
    }
}

/// Diagnostic details of a failed request.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ErrorInfo {
    /// HTTP status of the response, if one was received.
    pub status_code: Option<u16>,
    /// Response body as text, possibly truncated.
    pub raw_body: Option<String>,
    #[source]
    pub error: TransportError,
}

impl ErrorInfo {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// Outcome of a transport call.
#[derive(Debug)]
pub enum ApiResult<T> {
    Success { value: T, raw: RawResponse },
    Failure { error: ErrorInfo, raw: Option<RawResponse> },
}

impl<T> ApiResult<T> {
    pub fn ok(&self) -> bool {
        matches!(self, ApiResult::Success { .. })
    }

    /// The decoded value.
    ///
    /// # Panics
    /// Panics on a `Failure`; check `ok()` first or use `as_value`.
    pub fn value(&self) -> &T {
        match self {
            ApiResult::Success { value, .. } => value,
            ApiResult::Failure { error, .. } => {
                panic!("value() called on a failed request: {error}")
            }
        }
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            ApiResult::Success { value, .. } => Some(value),
            ApiResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            ApiResult::Success { .. } => None,
            ApiResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn raw(&self) -> Option<&RawResponse> {
        match self {
            ApiResult::Success { raw, .. } => Some(raw),
            ApiResult::Failure { raw, .. } => raw.as_ref(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.raw().map(|raw| raw.status_code)
    }

    pub fn into_result(self) -> Result<T, ErrorInfo> {
        match self {
            ApiResult::Success { value, .. } => Ok(value),
            ApiResult::Failure { error, .. } => Err(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        match self {
            ApiResult::Success { value, raw } => ApiResult::Success { value: f(value), raw },
            ApiResult::Failure { error, raw } => ApiResult::Failure { error, raw },
        }
    }
}
