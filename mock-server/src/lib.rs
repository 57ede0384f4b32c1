use axum::{
    body::Bytes,
    extract::RawQuery,
    http::{header, HeaderMap, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use std::time::Duration;

use log::debug;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Marker text served by `/html`.
pub const HTML_CONTENT: &str = "One SDK to rule them all";

/// First bytes of a PNG file, served by `/image.png`.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];

/// Declared as `text/plain` by `/malformed` but not valid UTF-8.
pub const MALFORMED_TEXT: &[u8] = &[b'o', b'k', 0xff, 0xfe];

/// Size of the `/large` download, above ureq's default 10 MiB read cap.
pub const LARGE_BODY_LEN: usize = 11 * 1024 * 1024;

/// How long `/slow` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

pub fn app() -> Router {
    Router::new()
        .route("/versions", get(versions))
        .route("/html", get(html))
        .route("/image.png", get(image))
        .route("/error", get(server_error))
        .route("/missing", get(not_found))
        .route("/malformed", get(malformed))
        .route("/unknown", get(unknown))
        .route("/empty", any(empty))
        .route("/large", get(large))
        .route("/slow", get(slow))
        .route("/echo", any(echo))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// API version document; key order is part of the fixture.
pub fn versions_document() -> Value {
    json!({
        "looker_release_version": "24.0.0",
        "current_version": {
            "version": "4.0",
            "full_version": "4.0.24.0",
            "status": "current",
        },
        "supported_versions": [
            {"version": "3.1", "status": "legacy"},
            {"version": "4.0", "status": "current"},
        ],
    })
}

async fn versions() -> Json<Value> {
    Json(versions_document())
}

async fn html() -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html><head><title>sdk</title></head>\
         <body><h1>{HTML_CONTENT}</h1></body></html>"
    ))
}

async fn image() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES)
}

async fn server_error() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "message": "Internal failure",
            "documentation_url": "https://example.com/errors",
        })),
    )
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({"message": "Not found"})))
}

async fn malformed() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], MALFORMED_TEXT)
}

async fn unknown() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "chemical/x-pdb")], "ATOM      1  N   MET A   1")
}

async fn empty() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn large() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], vec![0xa5u8; LARGE_BODY_LEN])
}

async fn slow() -> &'static str {
    tokio::time::sleep(SLOW_DELAY).await;
    "done"
}

/// Reflects the request back as JSON.
async fn echo(
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    debug!("echo {method} query={query:?}");
    let get_header = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "user_agent": get_header(header::USER_AGENT),
        "content_type": get_header(header::CONTENT_TYPE),
        "body": String::from_utf8_lossy(&body),
    }))
    .into_response()
}
