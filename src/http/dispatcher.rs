//! Request pipeline composition root.
//!
//! # Responsibilities
//! - Assign the correlation ID and derive the client identity
//! - Country deny-list (403) and rate limiting (429) ahead of routing
//! - Hand admitted requests to the [`Router`]
//! - Stamp security, request-ID and rate-limit headers on every response
//! - Record request metrics
//!
//! # Design Decisions
//! - Rebuilt wholesale on config reload; stores are passed in and survive
//! - Never fails: every path ends in a response

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::response::Response;

use crate::cache::{CacheAside, CacheStore};
use crate::config::EdgeConfig;
use crate::error::EdgeError;
use crate::http::handlers::{register_edge_routes, EdgeState};
use crate::http::request::{ensure_request_id, ClientIdentity, X_REQUEST_ID};
use crate::http::response::{forbidden, rate_limited};
use crate::observability::metrics;
use crate::origin::OriginFetcher;
use crate::routing::{EdgeMetadata, Router};
use crate::security::{CountryFilter, RateLimitDecision, RateLimiter, SecurityHeaders};
use crate::store::KeyValueStore;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Backing stores that outlive any one dispatcher.
#[derive(Clone)]
pub struct EdgeStores {
    pub cache: Arc<dyn CacheStore>,
    /// Counter store for the rate limiter; `None` leaves it unbound.
    pub kv: Option<Arc<dyn KeyValueStore>>,
}

/// The full edge pipeline for one configuration generation.
pub struct Dispatcher {
    router: Router,
    limiter: Option<RateLimiter>,
    exempt_paths: Vec<String>,
    countries: CountryFilter,
    trusted_proxies: Vec<IpAddr>,
    security_headers: SecurityHeaders,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("limiter", &self.limiter)
            .field("exempt_paths", &self.exempt_paths)
            .field("countries", &self.countries)
            .field("trusted_proxies", &self.trusted_proxies)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Build the dispatcher with the default edge routes.
    pub fn new(
        config: &EdgeConfig,
        stores: EdgeStores,
        origin: Arc<dyn OriginFetcher>,
    ) -> Result<Self, EdgeError> {
        let cache = CacheAside::new(stores.cache.clone(), config.cache.ttl());
        let state = Arc::new(EdgeState::new(config, cache, origin)?);

        let mut router = Router::new().with_body_limit(config.security.max_body_size);
        router.use_middleware(EdgeMetadata::new(config.origin.region.clone()));
        register_edge_routes(&mut router, state)?;

        tracing::debug!(routes = router.len(), "Edge routes registered");
        Ok(Self::from_parts(config, stores.kv, router))
    }

    /// Build the dispatcher around a caller-assembled router.
    pub fn from_parts(
        config: &EdgeConfig,
        kv: Option<Arc<dyn KeyValueStore>>,
        router: Router,
    ) -> Self {
        let limiter = config
            .rate_limit
            .enabled
            .then(|| RateLimiter::from_config(kv, &config.rate_limit));

        Self {
            router,
            limiter,
            exempt_paths: config.rate_limit.exempt_paths.clone(),
            countries: CountryFilter::from_config(&config.security),
            trusted_proxies: config.security.trusted_proxies.clone(),
            security_headers: SecurityHeaders::from_config(&config.security),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn security_headers(&self) -> &SecurityHeaders {
        &self.security_headers
    }

    /// Run one request through the pipeline.
    pub async fn dispatch(&self, mut request: Request<Body>, peer: Option<SocketAddr>) -> Response {
        let start = Instant::now();
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let request_id = ensure_request_id(request.headers_mut());
        let client = ClientIdentity::from_headers(request.headers(), peer, &self.trusted_proxies);
        let client_ip = client.ip.clone();

        let mut decision = None;
        let mut response = if self.countries.is_blocked(client.country.as_deref()) {
            let country = client.country.as_deref().unwrap_or_default();
            tracing::warn!(request_id = %request_id, client = %client_ip, country, "Blocked country");
            metrics::record_blocked(country);
            forbidden()
        } else {
            match self.check_rate(&client_ip, &path).await {
                Some(d) if !d.admitted => {
                    tracing::warn!(
                        request_id = %request_id,
                        client = %client_ip,
                        count = d.count,
                        limit = d.limit,
                        "Rate limit exceeded"
                    );
                    metrics::record_rate_limited();
                    let window = self.limiter.as_ref().map(RateLimiter::window).unwrap_or_default();
                    rate_limited(window)
                }
                d => {
                    decision = d;
                    request.extensions_mut().insert(client);
                    self.router.handle(request).await
                }
            }
        };

        let headers = response.headers_mut();
        self.security_headers.apply(headers);
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert(X_REQUEST_ID, value);
        }
        if let Some(d) = decision.filter(|d| !d.bypassed) {
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(d.limit));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(d.remaining()));
        }

        let status = response.status();
        metrics::record_request(&method, status.as_u16(), start);
        tracing::info!(
            request_id = %request_id,
            client = %client_ip,
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        response
    }

    async fn check_rate(&self, client: &str, path: &str) -> Option<RateLimitDecision> {
        let limiter = self.limiter.as_ref()?;
        if self.exempt_paths.iter().any(|p| p == path) {
            return None;
        }
        Some(limiter.check(client).await)
    }
}
