//! Error types for the transport.
//!
//! # Design
//! `TransportError` is the typed cause carried inside every `Failure`. Each
//! variant maps to exactly one `ErrorKind` so callers can branch on the kind
//! without matching on payloads. `NetworkError` is what an `HttpSend`
//! implementation reports when no HTTP response exists at all; its
//! `NetworkErrorKind` separates a user cancellation from genuine connectivity
//! failures. `ConfigError` is only raised while building a `Transport`, never
//! per request.

use std::fmt;

use thiserror::Error;

/// Why the underlying send produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// Connection refused, reset or otherwise not established.
    Connect,
    /// The host name could not be resolved.
    Dns,
    Timeout,
    /// The caller cancelled the send.
    Cancelled,
    Other,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkErrorKind::Connect => "connection failed",
            NetworkErrorKind::Dns => "host not found",
            NetworkErrorKind::Timeout => "timed out",
            NetworkErrorKind::Cancelled => "cancelled",
            NetworkErrorKind::Other => "network error",
        };
        f.write_str(name)
    }
}

/// A failed send, as reported by an `HttpSend` implementation.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct NetworkError {
    pub kind: NetworkErrorKind,
    pub message: String,
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A parameter value that has no URL representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("unsupported parameter type: {0}")]
    UnsupportedType(&'static str),

    #[error("parameter `{name}`: {source}")]
    Param {
        name: String,
        #[source]
        source: Box<EncodeError>,
    },
}

/// Everything that can turn a request into a `Failure`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The send itself failed; no response is available.
    #[error("network failure ({0})")]
    Network(#[from] NetworkError),

    /// The server answered with a status outside 200..=299.
    #[error("HTTP {status}")]
    HttpStatus { status: u16 },

    /// The body was declared as text but is not valid UTF-8.
    #[error("malformed {content_type} body: {source}")]
    MalformedEncoding {
        content_type: String,
        #[source]
        source: std::str::Utf8Error,
    },

    /// A structured body could not be deserialized into the requested type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// The body cannot be represented as the requested type.
    #[error("{mode} response ({content_type}) cannot be decoded as the requested type: {message}")]
    TypeMismatch {
        mode: &'static str,
        content_type: String,
        message: String,
    },

    /// The content type matched no pattern and the transport rejects unknown types.
    #[error("unrecognized content type `{0}`")]
    UnknownContentType(String),

    /// A request parameter could not be encoded.
    #[error("parameter encoding failed: {0}")]
    Encoding(#[from] EncodeError),
}

/// The taxonomy tag of a `TransportError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network(NetworkErrorKind),
    HttpStatus,
    MalformedEncoding,
    Deserialization,
    TypeMismatch,
    UnknownContentType,
    Encoding,
}

impl ErrorKind {
    pub fn is_network(&self) -> bool {
        matches!(self, ErrorKind::Network(_))
    }
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Network(e) => ErrorKind::Network(e.kind),
            TransportError::HttpStatus { .. } => ErrorKind::HttpStatus,
            TransportError::MalformedEncoding { .. } => ErrorKind::MalformedEncoding,
            TransportError::Deserialization(_) => ErrorKind::Deserialization,
            TransportError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            TransportError::UnknownContentType(_) => ErrorKind::UnknownContentType,
            TransportError::Encoding(_) => ErrorKind::Encoding,
        }
    }
}

/// Invalid transport configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url `{url}`: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base url `{0}` must use http or https")]
    Scheme(String),

    #[error("invalid header `{0}`")]
    Header(String),

    #[error("invalid content-type pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("could not load settings: {0}")]
    Load(#[from] config::ConfigError),
}
