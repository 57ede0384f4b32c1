//! HTTP transport runtime for API SDKs.
//!
//! # Overview
//! `Transport` sends requests through an injected `HttpSend` capability,
//! classifies each response by content type, decodes the body as bytes, text
//! or JSON and reports the outcome as an `ApiResult` instead of panicking or
//! returning bare errors. Parameters are encoded with `encode_param`.
//!
//! # Design
//! - `Transport` is stateless apart from configuration fixed at construction,
//!   so it can be shared across threads.
//! - Request building and response parsing are separate public steps; the
//!   I/O in between belongs to the sender (`UreqSender` with the default
//!   `ureq` feature, or any host-provided implementation).
//! - Every expected failure (network, HTTP status, malformed text, bad JSON,
//!   type mismatch, unencodable parameter) ends up in `ApiResult::Failure`.

pub mod encode;
pub mod error;
pub mod http;
pub mod mode;
pub mod result;
#[cfg(feature = "ureq")]
pub mod sender;
pub mod settings;
pub mod transport;

pub use encode::{encode_param, encode_str, ParamValue};
pub use error::{
    ConfigError, EncodeError, ErrorKind, NetworkError, NetworkErrorKind, TransportError,
};
pub use crate::http::{HttpRequest, HttpResponse, HttpSend, Method};
pub use mode::{classify, is_json, ContentTypeClassifier, ResponseMode};
pub use result::{ApiResult, Body, ErrorInfo, RawResponse};
#[cfg(feature = "ureq")]
pub use sender::UreqSender;
pub use settings::{TransportSettings, UnknownModePolicy};
pub use transport::{RequestBody, RequestOptions, Transport, DEFAULT_CONTENT_TYPE};
