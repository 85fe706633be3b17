//! Error types shared across the dispatcher.
//!
//! Every failure path terminates in a well-formed HTTP response: [`EdgeError`]
//! implements [`IntoResponse`] so the router boundary can convert any
//! middleware or handler fault without knowing where it came from.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::http::response::error_response;
use crate::origin::OriginError;
use crate::routing::matcher::PatternError;
use crate::store::StoreError;

/// Errors raised inside the request pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EdgeError {
    /// The request could not be interpreted (bad URL, unreadable body).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded the configured limit.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// A route template failed to compile.
    #[error("invalid route: {0}")]
    Pattern(#[from] PatternError),

    /// The origin could not be reached or timed out.
    #[error("origin error: {0}")]
    Origin(#[from] OriginError),

    /// A backing store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A middleware or handler failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EdgeError {
    /// Convenience constructor for handler faults.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Origin(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Pattern(_) | Self::Store(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl EdgeError {
    /// Render as a JSON error tagged with the request's correlation ID.
    pub fn into_response_for(self, request_id: &str, path: Option<&str>) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(request_id, error = %self, "request failed");
        }
        error_response(status, &self.to_string(), request_id, path)
    }
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        self.into_response_for("unknown", None)
    }
}
