//! Get-or-fetch-and-store over a [`CacheStore`].
//!
//! # Responsibilities
//! - Serve fresh entries tagged `X-Cache-Status: HIT` with their age
//! - On miss or staleness, call the fetcher once and store storable results
//! - Explicit invalidation by key
//!
//! # Design Decisions
//! - Freshness is derived from the `X-Cache-Time` header stored with the entry
//! - Caching is best-effort: store failures are logged, never surfaced
//! - Only exact-key deletion; no pattern invalidation

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue};
use chrono::{SecondsFormat, Utc};
use tokio::task::JoinHandle;
use url::Url;

use crate::cache::policy::{is_storable, ttl_from_headers};
use crate::cache::store::{CacheEntry, CacheKey, CacheStore, X_CACHE_TIME};
use crate::http::response::BufferedResponse;
use crate::observability::metrics;

pub const X_CACHE_STATUS: &str = "x-cache-status";
pub const X_CACHE_AGE: &str = "x-cache-age";

/// Per-call overrides for [`CacheAside::get_or_set`].
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Freshness lifetime; the component default when `None`.
    pub ttl: Option<Duration>,
    /// Explicit key; the request URL when `None`.
    pub key: Option<String>,
}

impl CacheOptions {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Cache-aside coordinator.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
}

impl std::fmt::Debug for CacheAside {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAside")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Effective key: `key` when given, else the request URL.
    pub fn key_for(&self, url: &Url, key: Option<&str>) -> CacheKey {
        match key {
            Some(key) => CacheKey::custom(key),
            None => CacheKey::for_url(url),
        }
    }

    /// Return the cached response for `url`, or fetch, store and return it.
    ///
    /// Fetcher errors are returned unchanged and nothing is stored. Neither
    /// is a non-2xx response or one marked `private`, `no-store` or
    /// `no-cache`; those pass through with their own `Cache-Control`.
    pub async fn get_or_set<F, Fut, E>(
        &self,
        url: &Url,
        options: CacheOptions,
        fetcher: F,
    ) -> Result<BufferedResponse, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BufferedResponse, E>>,
    {
        let ttl = options.ttl.unwrap_or(self.default_ttl);
        let key = self.key_for(url, options.key.as_deref());

        if let Some(hit) = self.lookup(&key, Some(ttl)).await {
            return Ok(hit);
        }

        let fresh = fetcher().await?;
        if !is_storable(fresh.status(), fresh.headers()) {
            tracing::debug!(key = %key, status = %fresh.status(), "Origin response not cacheable");
            return Ok(fresh);
        }

        Ok(self.store(&key, fresh, ttl).await)
    }

    /// A fresh entry under `key`, tagged HIT; `None` when absent or stale.
    ///
    /// Without an explicit `ttl` the entry's own `Cache-Control: max-age`
    /// decides, falling back to the default TTL.
    pub async fn lookup(&self, key: &CacheKey, ttl: Option<Duration>) -> Option<BufferedResponse> {
        let entry = match self.store.lookup(key).await {
            Ok(entry) => entry?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache lookup failed, treating as miss");
                return None;
            }
        };

        let ttl = ttl.unwrap_or_else(|| ttl_from_headers(&entry.headers, self.default_ttl));
        match entry.age_at(Utc::now()) {
            Some(age) if age < ttl.as_secs() => {
                tracing::debug!(key = %key, age, "Cache hit");
                metrics::record_cache_result("HIT");
                let mut response = entry.to_response();
                tag(&mut response, "HIT", age);
                Some(response)
            }
            age => {
                tracing::debug!(key = %key, age = ?age, "Cache entry stale");
                metrics::record_cache_result("STALE");
                None
            }
        }
    }

    /// Stamp and store `response` under `key`, returning it tagged MISS.
    ///
    /// The response is returned even when the store write fails.
    pub async fn store(&self, key: &CacheKey, response: BufferedResponse, ttl: Duration) -> BufferedResponse {
        let mut response = response;
        stamp(&mut response, ttl);

        let entry = CacheEntry::from_response(key.clone(), &response);
        if let Err(e) = self.store.put(key, entry).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed, serving uncached response");
        }

        metrics::record_cache_result("MISS");
        tag(&mut response, "MISS", 0);
        response
    }

    /// Store a stamped copy of `response` in the background.
    pub fn warm(&self, key: CacheKey, response: &BufferedResponse, ttl: Duration) -> JoinHandle<()> {
        let mut copy = clone_response(response);
        stamp(&mut copy, ttl);
        let entry = CacheEntry::from_response(key.clone(), &copy);
        let store = self.store.clone();

        tokio::spawn(async move {
            match store.put(&key, entry).await {
                Ok(()) => tracing::debug!(key = %key, "Cache warmed"),
                Err(e) => tracing::warn!(key = %key, error = %e, "Background cache write failed"),
            }
        })
    }

    /// Delete the entry at the effective key. Deleting an absent key is fine.
    pub async fn invalidate(&self, url: &Url, key: Option<&str>) -> bool {
        let key = self.key_for(url, key);
        match self.store.delete(&key).await {
            Ok(deleted) => {
                tracing::debug!(key = %key, deleted, "Cache invalidated");
                deleted
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
                false
            }
        }
    }
}

fn stamp(response: &mut BufferedResponse, ttl: Duration) {
    let headers = response.headers_mut();
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    if let Ok(value) = HeaderValue::from_str(&now) {
        headers.insert(X_CACHE_TIME, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", ttl.as_secs())) {
        headers.insert(header::CACHE_CONTROL, value);
    }
}

fn tag(response: &mut BufferedResponse, status: &'static str, age: u64) {
    let headers = response.headers_mut();
    headers.insert(X_CACHE_STATUS, HeaderValue::from_static(status));
    headers.insert(X_CACHE_AGE, HeaderValue::from(age));
}

pub(crate) fn clone_response(response: &BufferedResponse) -> BufferedResponse {
    let mut copy = BufferedResponse::new(response.body().clone());
    *copy.status_mut() = response.status();
    *copy.version_mut() = response.version();
    *copy.headers_mut() = response.headers().clone();
    copy
}
