//! HTTP Request Tracing
//!
//! Root span per request following HTTP semantic conventions. Response status,
//! the authenticated user and the target video are recorded as they become
//! known.

use hyper::header::{HeaderName, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{HeaderMap, Method, StatusCode};
use tracing::Span;

/// Create the root span for an HTTP request
pub fn create_request_span(method: &Method, path: &str, headers: &HeaderMap) -> Span {
    tracing::info_span!(
        "http.request",
        http.method = %method,
        http.target = %path,
        http.scheme = "http",
        http.request.content_type = header_str(headers, CONTENT_TYPE),
        http.request.content_length = header_str(headers, CONTENT_LENGTH),
        http.status_code = tracing::field::Empty,
        enduser.id = tracing::field::Empty,
        video.id = tracing::field::Empty,
        otel.kind = "server",
    )
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> &str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}

/// Record the final status and log the outcome
pub fn record_response(span: &Span, status: StatusCode) {
    span.record("http.status_code", status.as_u16());
    if status.is_server_error() {
        tracing::error!(parent: span, status = status.as_u16(), "Request failed");
    } else if status.is_client_error() {
        tracing::warn!(parent: span, status = status.as_u16(), "Request rejected");
    } else {
        tracing::info!(parent: span, status = status.as_u16(), "Request completed");
    }
}
