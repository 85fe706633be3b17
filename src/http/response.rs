//! Response construction for edge-generated replies.
//!
//! # Responsibilities
//! - Buffered response type shared by the cache and origin layers
//! - JSON error bodies (`{error, message, requestId, path}`)
//! - Canned 403/429/503 replies with their `Retry-After` hints
//!
//! # Design Decisions
//! - Origin responses are fully buffered so they can be cached and cloned
//! - `error` carries the canonical reason phrase of the status code

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Response as HttpResponse, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::ErrorBody;
use crate::http::request::X_REQUEST_ID;

/// A response whose body is fully in memory.
pub type BufferedResponse = HttpResponse<Bytes>;

/// Request bodies larger than this are rejected with 413.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// `Retry-After` sent when the origin is unavailable.
pub const BACKEND_RETRY_AFTER_SECS: u64 = 30;

/// JSON error reply tagged with the request ID.
pub fn error_response(
    status: StatusCode,
    message: &str,
    request_id: &str,
    path: Option<&str>,
) -> Response {
    let body = ErrorBody {
        error: status.canonical_reason().unwrap_or("Error").to_string(),
        message: message.to_string(),
        request_id: request_id.to_string(),
        path: path.map(str::to_string),
    };
    let mut response = (status, Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

/// 503 for origin timeouts and failures.
pub fn backend_unavailable(request_id: &str) -> Response {
    let body = ErrorBody {
        error: "Backend Unavailable".to_string(),
        message: "The backend service is temporarily unavailable".to_string(),
        request_id: request_id.to_string(),
        path: None,
    };
    let mut response = (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(BACKEND_RETRY_AFTER_SECS));
    response
}

/// 429 for clients over their window threshold.
pub fn rate_limited(window: Duration) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, HeaderValue::from(window.as_secs()))],
        "Rate limit exceeded",
    )
        .into_response()
}

/// 403 for blocked clients.
pub fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, "Access denied").into_response()
}

/// Convert a buffered response into one axum can send.
pub fn into_response(buffered: BufferedResponse) -> Response {
    let (parts, body) = buffered.into_parts();
    Response::from_parts(parts, Body::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = error_response(StatusCode::NOT_FOUND, "No matching route found", "req-1", Some("/nope"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[X_REQUEST_ID], "req-1");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = json(response).await;
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["message"], "No matching route found");
        assert_eq!(body["requestId"], "req-1");
        assert_eq!(body["path"], "/nope");
    }

    #[tokio::test]
    async fn test_backend_unavailable() {
        let response = backend_unavailable("req-2");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "30");

        let body = json(response).await;
        assert_eq!(body["error"], "Backend Unavailable");
        assert_eq!(body["requestId"], "req-2");
        assert!(body.get("path").is_none());
    }

    #[test]
    fn test_rate_limited() {
        let response = rate_limited(Duration::from_secs(60));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
    }

    #[tokio::test]
    async fn test_into_response_keeps_parts() {
        let mut buffered = BufferedResponse::new(Bytes::from_static(b"hello"));
        *buffered.status_mut() = StatusCode::CREATED;
        buffered.headers_mut().insert("x-test", HeaderValue::from_static("1"));

        let response = into_response(buffered);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-test"], "1");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }
}
