//! HTTP capability consumed by the transport.
//!
//! # Design
//! Requests and responses are plain data. `Transport` builds an `HttpRequest`
//! and hands it to whatever `HttpSend` implementation it was constructed with;
//! the sender performs the actual I/O and hands back an `HttpResponse` (or a
//! `NetworkError` when no response could be obtained). The transport itself
//! never opens sockets, which keeps it deterministic under test.

use bytes::Bytes;
pub use http::Method;

use crate::error::NetworkError;

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Fully qualified URL, query string included.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data, exactly as the sender received it.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// The send primitive the transport is built on.
///
/// Implementations own timeouts and cancellation and report both through
/// `NetworkError`. A non-2xx status is a successful send: it must come back as
/// `Ok(HttpResponse)` so the transport can attach the body to its diagnostics.
pub trait HttpSend: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, NetworkError>;
}

impl<S: HttpSend + ?Sized> HttpSend for &S {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, NetworkError> {
        (**self).send(request)
    }
}

impl<S: HttpSend + ?Sized> HttpSend for std::sync::Arc<S> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, NetworkError> {
        (**self).send(request)
    }
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
