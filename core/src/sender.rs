//! `HttpSend` implementation on top of `ureq`.
//!
//! The agent is configured with `http_status_as_error(false)` so 4xx/5xx
//! responses come back as data and the transport decides what they mean.
//! Response bodies are read without ureq's default size cap unless a limit
//! is set with `with_body_limit`.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use ureq::{Agent, RequestBuilder};

use crate::error::{NetworkError, NetworkErrorKind};
use crate::http::{HttpRequest, HttpResponse, HttpSend};

#[derive(Clone)]
pub struct UreqSender {
    agent: Agent,
    body_limit: u64,
}

impl UreqSender {
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self::from_agent(agent)
    }

    pub fn from_agent(agent: Agent) -> Self {
        Self {
            agent,
            body_limit: u64::MAX,
        }
    }

    /// Cap the bytes read from a response body; `None` removes the cap.
    pub fn with_body_limit(mut self, limit: Option<u64>) -> Self {
        self.body_limit = limit.unwrap_or(u64::MAX);
        self
    }
}

impl HttpSend for UreqSender {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, NetworkError> {
        let url = &request.url;
        let body = request.body.as_deref();

        let result = match request.method.clone() {
            Method::POST => send_with_body(self.agent.post(url), &request.headers, body),
            Method::PUT => send_with_body(self.agent.put(url), &request.headers, body),
            Method::PATCH => send_with_body(self.agent.patch(url), &request.headers, body),
            Method::GET => call(self.agent.get(url), &request.headers, body),
            Method::DELETE => call(self.agent.delete(url), &request.headers, body),
            Method::HEAD => call(self.agent.head(url), &request.headers, body),
            Method::OPTIONS => call(self.agent.options(url), &request.headers, body),
            Method::TRACE => call(self.agent.trace(url), &request.headers, body),
            other => {
                return Err(NetworkError::new(
                    NetworkErrorKind::Other,
                    format!("unsupported method {other}"),
                ))
            }
        };

        let mut response = result.map_err(network_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_vec()
            .map_err(network_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body: Bytes::from(body),
        })
    }
}

fn with_headers<B>(
    mut builder: RequestBuilder<B>,
    headers: &[(String, String)],
) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_with_body(
    builder: RequestBuilder<ureq::typestate::WithBody>,
    headers: &[(String, String)],
    body: Option<&[u8]>,
) -> Result<http::Response<ureq::Body>, ureq::Error> {
    let builder = with_headers(builder, headers);
    match body {
        Some(body) => builder.send(body),
        None => builder.send_empty(),
    }
}

fn call(
    builder: RequestBuilder<ureq::typestate::WithoutBody>,
    headers: &[(String, String)],
    body: Option<&[u8]>,
) -> Result<http::Response<ureq::Body>, ureq::Error> {
    let builder = with_headers(builder, headers);
    match body {
        Some(body) => builder.force_send_body().send(body),
        None => builder.call(),
    }
}

fn network_error(err: ureq::Error) -> NetworkError {
    let kind = match &err {
        ureq::Error::Timeout(_) => NetworkErrorKind::Timeout,
        ureq::Error::HostNotFound => NetworkErrorKind::Dns,
        ureq::Error::ConnectionFailed => NetworkErrorKind::Connect,
        ureq::Error::Io(e) => io_kind(e),
        _ => NetworkErrorKind::Other,
    };
    NetworkError::new(kind, err.to_string())
}

fn io_kind(err: &io::Error) -> NetworkErrorKind {
    match err.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrNotAvailable => NetworkErrorKind::Connect,
        io::ErrorKind::TimedOut => NetworkErrorKind::Timeout,
        io::ErrorKind::Interrupted => NetworkErrorKind::Cancelled,
        _ => NetworkErrorKind::Other,
    }
}
