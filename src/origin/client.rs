//! HTTP origin client on reqwest.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::header;

use crate::http::response::BufferedResponse;
use crate::origin::{OriginError, OriginFetcher, OriginRequest};

/// Fetches from HTTP(S) origins and buffers the response.
///
/// Redirects are passed through to the client rather than followed.
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: reqwest::Client,
}

impl HttpOrigin {
    pub fn new(connect_timeout: Duration) -> Result<Self, OriginError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| OriginError::Unreachable(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OriginFetcher for HttpOrigin {
    async fn fetch(&self, request: OriginRequest) -> Result<BufferedResponse, OriginError> {
        tracing::debug!(method = %request.method, url = %request.url, "Fetching from origin");

        let response = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| OriginError::Unreachable(e.to_string()))?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| OriginError::Unreachable(e.to_string()))?;

        let mut buffered = BufferedResponse::new(body);
        *buffered.status_mut() = status;
        *buffered.version_mut() = version;
        *buffered.headers_mut() = headers;
        // Body is buffered; the origin's framing no longer applies.
        buffered.headers_mut().remove(header::TRANSFER_ENCODING);
        buffered.headers_mut().remove(header::CONNECTION);
        Ok(buffered)
    }
}
