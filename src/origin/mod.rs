//! Origin fetching.
//!
//! # Data Flow
//! ```text
//! handler (Context)
//!     → OriginRequest::forward (rewrite URL onto origin, filter headers,
//!       add X-Request-ID / X-Edge-Region / X-Forwarded-For)
//!     → resilience::with_deadline
//!     → OriginFetcher::fetch (client.rs: reqwest)
//!     → BufferedResponse
//! ```
//!
//! # Design Decisions
//! - The fetcher is a trait so tests and alternative transports plug in
//! - Responses are buffered; the cache stores exactly what the client gets
//! - Cancellation is by dropping the fetch future

pub mod client;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use crate::http::request::{X_FORWARDED_FOR, X_REQUEST_ID};
use crate::http::response::BufferedResponse;
use crate::resilience::DeadlineExceeded;
use crate::routing::Context;

pub use client::HttpOrigin;

pub const X_EDGE_REGION: &str = "x-edge-region";

/// Headers that describe a single hop and never travel to the origin.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

/// Origin fetch failures.
#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    #[error("origin timed out: {0}")]
    Timeout(#[from] DeadlineExceeded),

    #[error("origin unreachable: {0}")]
    Unreachable(String),

    #[error("invalid origin url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl OriginError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Unreachable(_) => "unreachable",
            Self::InvalidUrl(_) => "invalid_url",
        }
    }
}

/// A request bound for an origin.
#[derive(Debug, Clone)]
pub struct OriginRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OriginRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Rewrite the request in `ctx` onto `origin`, appending path and query.
    pub fn forward(ctx: &Context, origin: &Url, region: &str) -> Result<Self, OriginError> {
        let base = origin.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{}", ctx.path()))?;
        url.set_query(ctx.url().query());

        let mut headers = ctx.headers().clone();
        for name in HOP_BY_HOP.iter() {
            headers.remove(name);
        }
        strip_connection_listed(&mut headers, ctx.headers());

        if let Ok(value) = HeaderValue::from_str(ctx.request_id()) {
            headers.insert(X_REQUEST_ID, value);
        }
        if let Ok(value) = HeaderValue::from_str(region) {
            headers.insert(X_EDGE_REGION, value);
        }
        if let Some(client) = ctx.client() {
            let chain = match ctx.headers().get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
                Some(existing) => format!("{existing}, {}", client.ip),
                None => client.ip.clone(),
            };
            if let Ok(value) = HeaderValue::from_str(&chain) {
                headers.insert(X_FORWARDED_FOR, value);
            }
        }

        Ok(Self {
            method: ctx.method().clone(),
            url,
            headers,
            body: ctx.body().clone(),
        })
    }
}

/// Headers named in `Connection` are hop-by-hop too.
fn strip_connection_listed(headers: &mut HeaderMap, original: &HeaderMap) {
    for value in original.get_all(header::CONNECTION) {
        let Ok(value) = value.to_str() else { continue };
        for name in value.split(',') {
            if let Ok(name) = HeaderName::from_bytes(name.trim().as_bytes()) {
                headers.remove(name);
            }
        }
    }
}

/// Performs the network fetch to an origin.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    async fn fetch(&self, request: OriginRequest) -> Result<BufferedResponse, OriginError>;
}
