//! Request dispatch and response decoding.
//!
//! # Design
//! `Transport` holds only configuration fixed at construction: the base URL,
//! the merged default headers, the content-type classifier and the
//! unknown-mode policy. It carries no per-request state, so a single instance
//! can serve concurrent callers on many threads.
//!
//! Every call is split the same way: `build_request` produces an
//! `HttpRequest`, the injected `HttpSend` executes it, and `parse_raw` /
//! `parse_response` turn the `HttpResponse` into an `ApiResult`. The build and
//! parse halves are public so hosts that do their own I/O can use them
//! directly.

use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace, warn};
use serde::de::value::{Error as ValueError, SeqDeserializer, StrDeserializer, UnitDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, Unexpected, Visitor};
use serde::Serialize;

use crate::encode::{encode_param, encode_str, ParamValue};
use crate::error::{ConfigError, EncodeError, TransportError};
use crate::http::{HttpRequest, HttpResponse, HttpSend, Method};
use crate::mode::{is_json, ContentTypeClassifier, ResponseMode};
use crate::result::{ApiResult, Body, ErrorInfo, RawResponse};
use crate::settings::{TransportSettings, UnknownModePolicy};

/// Assumed when a response carries no `Content-Type` header.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// A request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Bytes(Bytes),
    Text(String),
    /// Serialized JSON; build with `RequestBody::json`.
    Json(String),
}

impl RequestBody {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(RequestBody::Json(serde_json::to_string(value)?))
    }

    fn content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Bytes(_) => None,
            RequestBody::Text(_) => Some(TEXT_CONTENT_TYPE),
            RequestBody::Json(_) => Some(JSON_CONTENT_TYPE),
        }
    }

    fn into_bytes(self) -> Bytes {
        match self {
            RequestBody::Bytes(bytes) => bytes,
            RequestBody::Text(text) | RequestBody::Json(text) => Bytes::from(text),
        }
    }
}

/// Optional parts of a request. Parameters are sent in insertion order;
/// absent ones are skipped.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub params: Vec<(String, Option<ParamValue>)>,
    pub body: Option<RequestBody>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.push((name.to_string(), Some(value.into())));
        self
    }

    pub fn optional_param<V: Into<ParamValue>>(mut self, name: &str, value: Option<V>) -> Self {
        self.params.push((name.to_string(), value.map(Into::into)));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Sends requests through `S` and decodes the responses.
///
/// Holds the base URL, merged default headers, classifier and decoding
/// policies. Nothing changes after construction.
#[derive(Debug, Clone)]
pub struct Transport<S> {
    sender: S,
    base_url: String,
    timeout: Duration,
    headers: Vec<(String, String)>,
    classifier: ContentTypeClassifier,
    unknown_mode: UnknownModePolicy,
    max_error_body: usize,
}

#[cfg(feature = "ureq")]
impl Transport<crate::sender::UreqSender> {
    /// Build a transport that sends through `ureq` with the configured timeout
    /// and response size limit.
    pub fn from_settings(settings: &TransportSettings) -> Result<Self, ConfigError> {
        let sender = crate::sender::UreqSender::new(settings.timeout)
            .with_body_limit(settings.max_response_body);
        Self::new(settings, sender)
    }
}

impl<S: HttpSend> Transport<S> {
    pub fn new(settings: &TransportSettings, sender: S) -> Result<Self, ConfigError> {
        let base_url = settings.validate()?;

        let mut headers = Vec::new();
        for (name, value) in &settings.default_headers {
            set_header(&mut headers, name, value);
        }
        if let Some(agent) = &settings.agent_tag {
            if find(&headers, "user-agent").is_none() {
                headers.push(("User-Agent".to_string(), agent.clone()));
            }
        }

        Ok(Self {
            sender,
            base_url,
            timeout: settings.timeout,
            headers,
            classifier: settings.classifier()?,
            unknown_mode: settings.unknown_mode,
            max_error_body: settings.max_error_body,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn classifier(&self) -> &ContentTypeClassifier {
        &self.classifier
    }

    pub fn classify(&self, content_type: &str) -> ResponseMode {
        self.classifier.classify(content_type)
    }

    /// Resolve `path` against the base URL and append the present parameters.
    ///
    /// Absolute `http(s)://` URLs are used as given. The path itself is not
    /// re-encoded.
    pub fn make_url(
        &self,
        path: &str,
        params: &[(String, Option<ParamValue>)],
    ) -> Result<String, EncodeError> {
        let mut url = if is_absolute(path) {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        };

        let mut separator = if url.contains('?') { '&' } else { '?' };
        for (name, value) in params {
            let Some(value) = value else { continue };
            let encoded = encode_param(value).map_err(|source| EncodeError::Param {
                name: name.clone(),
                source: Box::new(source),
            })?;
            url.push(separator);
            url.push_str(&encode_str(name));
            url.push('=');
            url.push_str(&encoded);
            separator = '&';
        }
        Ok(url)
    }

    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<HttpRequest, EncodeError> {
        let url = self.make_url(path, &options.params)?;

        let mut headers = self.headers.clone();
        for (name, value) in &options.headers {
            trace!("Request header override: {name}");
            set_header(&mut headers, name, value);
        }
        if let Some(content_type) = options.body.as_ref().and_then(RequestBody::content_type) {
            if find(&headers, "content-type").is_none() {
                headers.push(("Content-Type".to_string(), content_type.to_string()));
            }
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body: options.body.map(RequestBody::into_bytes),
        })
    }

    /// Send a request and return the response without typed decoding.
    ///
    /// Only a failed send or a parameter that cannot be encoded produces a
    /// `Failure` without a `RawResponse`.
    pub fn raw_request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> ApiResult<RawResponse> {
        match self.execute(method, url, options) {
            Ok(response) => self.parse_raw(response),
            Err(error) => ApiResult::Failure { error, raw: None },
        }
    }

    /// Send a request and decode the body into `T`.
    pub fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> ApiResult<T> {
        match self.execute(method, path, options) {
            Ok(response) => self.parse_response(response),
            Err(error) => ApiResult::Failure { error, raw: None },
        }
    }

    fn execute(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, ErrorInfo> {
        let request = self.build_request(method, path, options).map_err(|e| {
            warn!("Could not build request for {path}: {e}");
            ErrorInfo {
                status_code: None,
                raw_body: None,
                error: TransportError::Encoding(e),
            }
        })?;

        debug!("{} {}", request.method, request.url);
        self.sender.send(&request).map_err(|e| {
            warn!("{} {} failed: {e}", request.method, request.url);
            ErrorInfo {
                status_code: None,
                raw_body: None,
                error: TransportError::Network(e),
            }
        })
    }

    /// Classify and decode a received response.
    pub fn parse_raw(&self, response: HttpResponse) -> ApiResult<RawResponse> {
        match self.decode_raw(response) {
            Ok(raw) => ApiResult::Success { value: raw.clone(), raw },
            Err((error, raw)) => ApiResult::Failure { error, raw },
        }
    }

    /// Classify, decode and deserialize a received response into `T`.
    pub fn parse_response<T: DeserializeOwned>(&self, response: HttpResponse) -> ApiResult<T> {
        let mut raw = match self.decode_raw(response) {
            Ok(raw) => raw,
            Err((error, raw)) => return ApiResult::Failure { error, raw },
        };

        match decode_value::<T>(&raw) {
            Ok(value) => ApiResult::Success { value, raw },
            Err(error) => {
                warn!("Could not decode {} response: {error}", raw.content_type);
                raw.ok = false;
                let error = ErrorInfo {
                    status_code: Some(raw.status_code),
                    raw_body: Some(truncate(raw.body.to_string_lossy(), self.max_error_body)),
                    error,
                };
                ApiResult::Failure { error, raw: Some(raw) }
            }
        }
    }

    fn decode_raw(
        &self,
        response: HttpResponse,
    ) -> Result<RawResponse, (ErrorInfo, Option<RawResponse>)> {
        let content_type = response
            .header("content-type")
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let mode = self.classifier.classify(&content_type);
        let HttpResponse { status, headers, body } = response;
        let success = (200..=299).contains(&status);
        debug!("Response {status} {content_type} ({mode}), {} bytes", body.len());

        let mut malformed = None;
        let body = match mode {
            ResponseMode::Binary => Body::Binary(body),
            ResponseMode::String | ResponseMode::Unknown => match std::str::from_utf8(&body) {
                Ok(text) => Body::Text(text.into()),
                Err(source) => {
                    if mode == ResponseMode::String {
                        malformed = Some(source);
                    }
                    Body::Binary(body)
                }
            },
        };

        let mut raw = RawResponse {
            ok: success,
            status_code: status,
            content_type,
            mode,
            headers,
            body,
        };

        let error = if !success {
            Some(TransportError::HttpStatus { status })
        } else if let Some(source) = malformed {
            Some(TransportError::MalformedEncoding {
                content_type: raw.content_type.clone(),
                source,
            })
        } else if mode == ResponseMode::Unknown && self.unknown_mode == UnknownModePolicy::Reject {
            Some(TransportError::UnknownContentType(raw.content_type.clone()))
        } else {
            None
        };

        match error {
            None => Ok(raw),
            Some(error) => {
                warn!("Request failed with status {status}: {error}");
                raw.ok = false;
                let error = ErrorInfo {
                    status_code: Some(status),
                    raw_body: Some(truncate(raw.body.to_string_lossy(), self.max_error_body)),
                    error,
                };
                Err((error, Some(raw)))
            }
        }
    }
}

/// Deserialize a decoded body into `T`.
///
/// Empty bodies are offered to `T` as unit first, so `()` and `Option<_>`
/// accept `204 No Content`. JSON text goes through `serde_json`, other text is
/// offered as a string and bytes as a byte sequence.
fn decode_value<T: DeserializeOwned>(raw: &RawResponse) -> Result<T, TransportError> {
    if raw.body.is_empty() {
        if let Ok(value) = T::deserialize(UnitDeserializer::<ValueError>::new()) {
            return Ok(value);
        }
    }

    match &raw.body {
        Body::Text(text) if is_json(&raw.content_type) => {
            serde_json::from_str(text).map_err(TransportError::Deserialization)
        }
        Body::Text(text) => T::deserialize(StrDeserializer::<ValueError>::new(text)).map_err(|e| {
            TransportError::TypeMismatch {
                mode: raw.mode.as_str(),
                content_type: raw.content_type.clone(),
                message: e.to_string(),
            }
        }),
        Body::Binary(bytes) => T::deserialize(ByteDeserializer(bytes)).map_err(|e| {
            TransportError::TypeMismatch {
                mode: raw.mode.as_str(),
                content_type: raw.content_type.clone(),
                message: e.to_string(),
            }
        }),
    }
}

/// Offers a byte body only to types that ask for bytes or a sequence, so
/// `Vec<u8>` and `Bytes` decode while self-describing types such as
/// `serde_json::Value` are refused.
struct ByteDeserializer<'a>(&'a [u8]);

impl<'de> Deserializer<'de> for ByteDeserializer<'_> {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::invalid_type(Unexpected::Bytes(self.0), &visitor))
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_bytes(self.0)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_byte_buf(self.0.to_vec())
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(SeqDeserializer::<_, ValueError>::new(self.0.iter().copied()))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct tuple tuple_struct map struct enum identifier ignored_any
    }
}

fn is_absolute(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn find<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    crate::http::find_header(headers, name)
}

/// Insert or replace a header, matching names case-insensitively.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
        Some(entry) => entry.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// Cut `text` to at most `max` bytes on a char boundary, marking the cut.
fn truncate(mut text: String, max: usize) -> String {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let dropped = text.len() - end;
    text.truncate(end);
    text.push_str(&format!("... [{dropped} bytes truncated]"));
    text
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::{ErrorKind, NetworkError, NetworkErrorKind};

    /// Replays a canned response and records the request it was given.
    #[derive(Debug)]
    struct Canned {
        response: Result<HttpResponse, NetworkError>,
        seen: Mutex<Option<HttpRequest>>,
    }

    impl Canned {
        fn new(status: u16, content_type: Option<&str>, body: &[u8]) -> Self {
            let headers = content_type
                .map(|ct| vec![("Content-Type".to_string(), ct.to_string())])
                .unwrap_or_default();
            Self {
                response: Ok(HttpResponse {
                    status,
                    headers,
                    body: Bytes::copy_from_slice(body),
                }),
                seen: Mutex::new(None),
            }
        }

        fn failing(kind: NetworkErrorKind) -> Self {
            Self {
                response: Err(NetworkError::new(kind, "canned")),
                seen: Mutex::new(None),
            }
        }

        fn last(&self) -> HttpRequest {
            self.seen.lock().unwrap().clone().unwrap()
        }
    }

    impl HttpSend for Canned {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, NetworkError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            self.response.clone()
        }
    }

    fn settings() -> TransportSettings {
        TransportSettings::new("http://localhost:3000/")
    }

    fn transport(sender: &Canned) -> Transport<&Canned> {
        Transport::new(&settings(), sender).unwrap()
    }

    #[test]
    fn make_url_joins_base_and_params() {
        let sender = Canned::new(200, None, b"");
        let t = transport(&sender);
        let params = vec![
            ("name".to_string(), Some(ParamValue::from("foo/bar"))),
            ("skip".to_string(), None),
            ("all".to_string(), Some(ParamValue::from(true))),
        ];
        assert_eq!(
            t.make_url("/users", &params).unwrap(),
            "http://localhost:3000/users?name=foo%2Fbar&all=true"
        );
        assert_eq!(t.make_url("users", &[]).unwrap(), "http://localhost:3000/users");
        assert_eq!(t.make_url("https://example.com/x", &[]).unwrap(), "https://example.com/x");
        assert_eq!(
            t.make_url("/search?q=1", &params[2..]).unwrap(),
            "http://localhost:3000/search?q=1&all=true"
        );
    }

    #[test]
    fn make_url_names_failing_param() {
        let sender = Canned::new(200, None, b"");
        let t = transport(&sender);
        let params = vec![("ratio".to_string(), Some(ParamValue::Float(f64::INFINITY)))];
        let err = t.make_url("/x", &params).unwrap_err();
        assert!(err.to_string().contains("ratio"));
    }

    #[test]
    fn headers_merge_with_request_precedence() {
        let mut settings = settings();
        settings.default_headers.insert("X-Client".to_string(), "default".to_string());
        let sender = Canned::new(200, Some("text/plain"), b"ok");
        let t = Transport::new(&settings, &sender).unwrap();

        let options = RequestOptions::new()
            .header("x-client", "override")
            .body(RequestBody::json(&serde_json::json!({"a": 1})).unwrap());
        t.raw_request(Method::POST, "/things", options);

        let request = sender.last();
        assert_eq!(request.header("X-Client"), Some("override"));
        assert!(request.header("user-agent").unwrap().starts_with("rtl-core/"));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(&br#"{"a":1}"#[..]));
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let sender = Canned::new(200, Some("text/plain"), b"ok");
        let t = transport(&sender);
        let options = RequestOptions::new()
            .header("Content-Type", "application/sql")
            .body(RequestBody::Text("select 1".to_string()));
        t.raw_request(Method::POST, "/sql", options);
        assert_eq!(sender.last().header("content-type"), Some("application/sql"));
    }

    #[test]
    fn json_into_ordered_map() {
        let sender = Canned::new(200, Some("application/json"), br#"{"b":1,"a":2}"#);
        let result = transport(&sender).request::<serde_json::Map<String, serde_json::Value>>(
            Method::GET,
            "/x",
            RequestOptions::new(),
        );
        assert!(result.ok());
        let keys: Vec<&str> = result.value().keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn text_into_string() {
        let sender = Canned::new(200, Some("text/html; charset=utf-8"), b"<p>hi</p>");
        let result = transport(&sender).request::<String>(Method::GET, "/", RequestOptions::new());
        assert_eq!(result.value(), "<p>hi</p>");
    }

    #[test]
    fn binary_into_bytes() {
        let sender = Canned::new(200, Some("image/png"), &[0x89, b'P', b'N', b'G', 0xff]);
        let result = transport(&sender).request::<Vec<u8>>(
            Method::GET,
            "/img",
            RequestOptions::new(),
        );
        assert_eq!(result.value(), &vec![0x89, b'P', b'N', b'G', 0xff]);
        assert_eq!(result.raw().unwrap().mode, ResponseMode::Binary);
    }

    #[test]
    fn binary_into_string_is_type_mismatch() {
        let sender = Canned::new(200, Some("image/png"), &[1, 2, 3]);
        let result = transport(&sender).request::<String>(
            Method::GET,
            "/img",
            RequestOptions::new(),
        );
        let error = result.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::TypeMismatch);
        assert!(!result.raw().unwrap().ok);
    }

    #[test]
    fn binary_into_bytes_buffer() {
        let sender = Canned::new(200, Some("application/pdf"), b"%PDF-1.7");
        let result = transport(&sender).request::<Bytes>(
            Method::GET,
            "/doc",
            RequestOptions::new(),
        );
        assert_eq!(result.value(), &Bytes::from_static(b"%PDF-1.7"));
    }

    #[test]
    fn binary_into_self_describing_type_is_type_mismatch() {
        let sender = Canned::new(200, Some("image/png"), &[1, 2, 3]);
        let t = transport(&sender);

        let result = t.request::<serde_json::Value>(Method::GET, "/img", RequestOptions::new());
        let error = result.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::TypeMismatch);
        assert!(error.to_string().starts_with("binary response (image/png)"), "{error}");

        let result = t.request::<serde_json::Map<String, serde_json::Value>>(
            Method::GET,
            "/img",
            RequestOptions::new(),
        );
        assert_eq!(result.error().unwrap().kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn unknown_bytes_mismatch_names_unknown_mode() {
        let sender = Canned::new(200, Some("chemical/x-pdb"), &[0xff, 0x00]);
        let result = transport(&sender).request::<String>(Method::GET, "/x", RequestOptions::new());
        let error = result.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::TypeMismatch);
        assert!(error.to_string().starts_with("unknown response"), "{error}");
    }

    #[test]
    fn missing_content_type_is_binary() {
        let sender = Canned::new(200, None, b"abc");
        let result = transport(&sender).raw_request(Method::GET, "/blob", RequestOptions::new());
        let raw = result.value();
        assert_eq!(raw.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(raw.mode, ResponseMode::Binary);
        assert_eq!(raw.body, Body::Binary(Bytes::from_static(b"abc")));
    }

    #[test]
    fn empty_body_decodes_as_unit() {
        let sender = Canned::new(204, None, b"");
        let result = transport(&sender).request::<()>(Method::DELETE, "/x", RequestOptions::new());
        assert!(result.ok());
        let result = transport(&sender).request::<Option<serde_json::Value>>(
            Method::DELETE,
            "/x",
            RequestOptions::new(),
        );
        assert_eq!(result.value(), &None);
    }

    #[test]
    fn bad_json_is_deserialization_failure_with_body() {
        let sender = Canned::new(200, Some("application/json"), b"{not json");
        let result = transport(&sender).request::<serde_json::Value>(
            Method::GET,
            "/x",
            RequestOptions::new(),
        );
        let error = result.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::Deserialization);
        assert_eq!(error.raw_body.as_deref(), Some("{not json"));
        assert_eq!(error.status_code, Some(200));
    }

    #[test]
    fn error_body_is_truncated() {
        let mut settings = settings();
        settings.max_error_body = 8;
        let body = "é".repeat(20);
        let sender = Canned::new(200, Some("application/json"), body.as_bytes());
        let t = Transport::new(&settings, &sender).unwrap();
        let result = t.request::<serde_json::Value>(Method::GET, "/x", RequestOptions::new());
        let raw_body = result.error().unwrap().raw_body.clone().unwrap();
        assert!(raw_body.starts_with("éééé..."));
        assert!(raw_body.ends_with("[32 bytes truncated]"));
    }

    #[test]
    fn error_status_keeps_body() {
        let sender = Canned::new(500, Some("application/json"), br#"{"message":"boom"}"#);
        let result = transport(&sender).request::<serde_json::Value>(
            Method::GET,
            "/x",
            RequestOptions::new(),
        );
        let error = result.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::HttpStatus);
        assert_eq!(error.status_code, Some(500));
        assert!(error.raw_body.as_deref().unwrap().contains("boom"));
        assert!(!result.raw().unwrap().ok);
    }

    #[test]
    fn error_status_without_content_type_keeps_body() {
        let sender = Canned::new(500, None, b"Internal Server Error: db down");
        let result = transport(&sender).raw_request(Method::GET, "/x", RequestOptions::new());
        let error = result.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::HttpStatus);
        assert_eq!(error.raw_body.as_deref(), Some("Internal Server Error: db down"));
        assert_eq!(result.raw().unwrap().mode, ResponseMode::Binary);
    }

    #[test]
    fn invalid_pattern_fails_construction() {
        let mut settings = settings();
        settings.binary_content_types = Some(vec!["image/[png".to_string()]);
        let sender = Canned::new(200, None, b"");
        let err = Transport::new(&settings, &sender).unwrap_err();
        assert!(matches!(err, ConfigError::Pattern { .. }), "{err}");
    }

    #[test]
    fn malformed_text_fails() {
        let sender = Canned::new(200, Some("text/plain"), &[b'a', 0xff, 0xfe]);
        let result = transport(&sender).raw_request(Method::GET, "/x", RequestOptions::new());
        let error = result.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::MalformedEncoding);
        assert!(error.raw_body.as_deref().unwrap().starts_with('a'));
        assert_eq!(result.raw().unwrap().body.len(), 3);
    }

    #[test]
    fn unknown_mode_falls_back_to_bytes() {
        let sender = Canned::new(200, Some("chemical/x-pdb"), &[0xff, 0x00]);
        let result = transport(&sender).raw_request(Method::GET, "/x", RequestOptions::new());
        let raw = result.value();
        assert_eq!(raw.mode, ResponseMode::Unknown);
        assert_eq!(raw.body.as_bytes(), &[0xff, 0x00]);

        let sender = Canned::new(200, Some("chemical/x-pdb"), b"ATOM 1");
        let result = transport(&sender).raw_request(Method::GET, "/x", RequestOptions::new());
        assert_eq!(result.value().body.as_text(), Some("ATOM 1"));
    }

    #[test]
    fn unknown_mode_can_be_rejected() {
        let mut settings = settings();
        settings.unknown_mode = UnknownModePolicy::Reject;
        let sender = Canned::new(200, Some("chemical/x-pdb"), b"ATOM 1");
        let t = Transport::new(&settings, &sender).unwrap();
        let result = t.raw_request(Method::GET, "/x", RequestOptions::new());
        assert_eq!(result.error().unwrap().kind(), ErrorKind::UnknownContentType);
    }

    #[test]
    fn network_failure_has_no_response() {
        let sender = Canned::failing(NetworkErrorKind::Cancelled);
        let result = transport(&sender).request::<String>(Method::GET, "/x", RequestOptions::new());
        let error = result.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::Network(NetworkErrorKind::Cancelled));
        assert!(result.raw().is_none());
        assert!(error.status_code.is_none());
    }

    #[test]
    fn encoding_failure_skips_send() {
        let sender = Canned::new(200, None, b"");
        let options = RequestOptions::new().param("bad", f64::NAN);
        let result = transport(&sender).raw_request(Method::GET, "/x", options);
        assert_eq!(result.error().unwrap().kind(), ErrorKind::Encoding);
        assert!(sender.seen.lock().unwrap().is_none());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short".to_string(), 10), "short");
        assert_eq!(truncate("aé".to_string(), 2), "a... [2 bytes truncated]");
    }
}
