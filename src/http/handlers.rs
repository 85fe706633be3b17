//! Default edge routes.
//!
//! | Method   | Template          | Handler                                  |
//! |----------|-------------------|------------------------------------------|
//! | ALL      | `/healthz`        | health JSON                              |
//! | ALL      | `/edge/healthz`   | health JSON                              |
//! | ALL      | `/api/*path`      | backend proxy, GET via cache-aside       |
//! | GET/HEAD | `/static/*path`   | static origin, background cache warm-up  |
//! | GET/HEAD | `/assets/*path`   | static origin, background cache warm-up  |
//! | GET/HEAD | `/`               | static origin                            |
//! | GET/HEAD | `/*path`          | static origin                            |
//!
//! Only GET fills the cache. HEAD is answered from the GET entry with the
//! body dropped, or passed to the origin uncached.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderValue, Method};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use url::Url;

use crate::cache::{should_cache, ttl_from_headers, CacheAside, CacheOptions, X_CACHE_AGE, X_CACHE_STATUS};
use crate::config::EdgeConfig;
use crate::error::EdgeError;
use crate::http::response::{backend_unavailable, into_response, BufferedResponse};
use crate::observability::metrics;
use crate::origin::{OriginError, OriginFetcher, OriginRequest};
use crate::resilience::with_deadline;
use crate::routing::{Context, HandlerResult, Router};

/// Shared state of the default handlers.
pub struct EdgeState {
    pub backend_url: Url,
    pub static_url: Url,
    pub region: String,
    pub origin_timeout: Duration,
    pub cache: CacheAside,
    pub origin: Arc<dyn OriginFetcher>,
}

impl EdgeState {
    pub fn new(
        config: &EdgeConfig,
        cache: CacheAside,
        origin: Arc<dyn OriginFetcher>,
    ) -> Result<Self, EdgeError> {
        let backend_url = Url::parse(&config.origin.backend_url)
            .map_err(|e| EdgeError::Origin(OriginError::InvalidUrl(e)))?;
        let static_url = Url::parse(&config.origin.static_url)
            .map_err(|e| EdgeError::Origin(OriginError::InvalidUrl(e)))?;

        Ok(Self {
            backend_url,
            static_url,
            region: config.origin.region.clone(),
            origin_timeout: config.origin.timeout(),
            cache,
            origin,
        })
    }

    /// One origin fetch under the configured deadline.
    async fn fetch(&self, request: OriginRequest) -> Result<BufferedResponse, OriginError> {
        with_deadline(self.origin_timeout, self.origin.fetch(request)).await
    }
}

/// Register the default routes on `router`.
pub fn register_edge_routes(router: &mut Router, state: Arc<EdgeState>) -> Result<(), EdgeError> {
    for template in ["/healthz", "/edge/healthz"] {
        let s = state.clone();
        router.any(template, move |ctx: Context| health(s.clone(), ctx))?;
    }

    let s = state.clone();
    router.any("/api/*path", move |ctx: Context| api_proxy(s.clone(), ctx))?;

    for template in ["/static/*path", "/assets/*path", "/", "/*path"] {
        let s = state.clone();
        router.get(template, move |ctx: Context| static_site(s.clone(), ctx))?;
        let s = state.clone();
        router.head(template, move |ctx: Context| static_site(s.clone(), ctx))?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct HealthBody<'a> {
    status: &'static str,
    edge: &'static str,
    timestamp: String,
    region: &'a str,
    #[serde(rename = "requestId")]
    request_id: &'a str,
}

async fn health(state: Arc<EdgeState>, ctx: Context) -> HandlerResult {
    let body = HealthBody {
        status: "healthy",
        edge: "operational",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        region: &state.region,
        request_id: ctx.request_id(),
    };
    Ok(ctx.finish(Json(body).into_response()))
}

/// Proxy to the backend. GETs go through the cache; successful writes
/// invalidate the cached copy of the same URL.
async fn api_proxy(state: Arc<EdgeState>, ctx: Context) -> HandlerResult {
    let request = match OriginRequest::forward(&ctx, &state.backend_url, &state.region) {
        Ok(request) => request,
        Err(e) => return Ok(origin_failed(&ctx, "backend", e)),
    };

    let result = match *ctx.method() {
        Method::GET => {
            state
                .cache
                .get_or_set(ctx.url(), CacheOptions::default(), || state.fetch(request))
                .await
        }
        Method::HEAD => {
            let key = state.cache.key_for(ctx.url(), None);
            match state.cache.lookup(&key, Some(state.cache.default_ttl())).await {
                Some(hit) => Ok(without_body(hit)),
                None => state.fetch(request).await,
            }
        }
        _ => {
            let result = state.fetch(request).await;
            if matches!(&result, Ok(response) if response.status().is_success()) {
                state.cache.invalidate(ctx.url(), None).await;
            }
            result
        }
    };

    match result {
        Ok(response) => Ok(ctx.finish(into_response(response))),
        Err(e) => Ok(origin_failed(&ctx, "backend", e)),
    }
}

/// Serve from the static origin, warming the cache in the background.
async fn static_site(state: Arc<EdgeState>, ctx: Context) -> HandlerResult {
    let head = *ctx.method() == Method::HEAD;
    let key = state.cache.key_for(ctx.url(), None);
    if let Some(hit) = state.cache.lookup(&key, None).await {
        let hit = if head { without_body(hit) } else { hit };
        return Ok(ctx.finish(into_response(hit)));
    }

    let request = match OriginRequest::forward(&ctx, &state.static_url, &state.region) {
        Ok(request) => request,
        Err(e) => return Ok(origin_failed(&ctx, "static", e)),
    };

    let mut response = match state.fetch(request).await {
        Ok(response) => response,
        Err(e) => return Ok(origin_failed(&ctx, "static", e)),
    };

    if !head && should_cache(ctx.method(), response.status(), response.headers()) {
        let ttl = ttl_from_headers(response.headers(), state.cache.default_ttl());
        state.cache.warm(key, &response, ttl);
        if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", ttl.as_secs())) {
            response.headers_mut().insert(header::CACHE_CONTROL, value);
        }
    }
    let headers = response.headers_mut();
    headers.insert(X_CACHE_STATUS, HeaderValue::from_static("MISS"));
    headers.insert(X_CACHE_AGE, HeaderValue::from_static("0"));

    Ok(ctx.finish(into_response(response)))
}

/// HEAD view of a cached GET: same headers, no body.
fn without_body(mut response: BufferedResponse) -> BufferedResponse {
    let len = response.body().len();
    response
        .headers_mut()
        .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    *response.body_mut() = Bytes::new();
    response
}

fn origin_failed(ctx: &Context, origin: &'static str, error: OriginError) -> axum::response::Response {
    tracing::error!(
        request_id = %ctx.request_id(),
        path = %ctx.path(),
        origin,
        error = %error,
        "Origin fetch failed"
    );
    metrics::record_origin_failure(origin, error.reason());
    ctx.finish(backend_unavailable(ctx.request_id()))
}
