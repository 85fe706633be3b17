//! Cache store collaborator and its in-memory implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use url::Url;

use crate::cache::policy::ttl_from_headers;
use crate::http::response::BufferedResponse;
use crate::store::StoreError;

/// Header carrying the insertion timestamp (RFC 3339).
pub const X_CACHE_TIME: &str = "x-cache-time";

/// Host used for caller-supplied keys.
const INTERNAL_KEY_BASE: &str = "https://cache.internal/";

/// Identity of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a request URL; the fragment never reaches the edge and is dropped.
    pub fn for_url(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(url.into())
    }

    /// Key for a caller-supplied name.
    pub fn custom(key: &str) -> Self {
        Self(format!("{INTERNAL_KEY_BASE}{}", key.trim_start_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored response. Replaced wholesale, never mutated in place.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CacheEntry {
    pub fn from_response(key: CacheKey, response: &BufferedResponse) -> Self {
        Self {
            key,
            status: response.status(),
            headers: response.headers().clone(),
            body: response.body().clone(),
        }
    }

    pub fn to_response(&self) -> BufferedResponse {
        let mut response = BufferedResponse::new(self.body.clone());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
    }

    /// Insertion time, if the entry carries a readable timestamp.
    pub fn stored_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.headers.get(X_CACHE_TIME)?.to_str().ok()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Whole seconds since insertion; `None` means infinitely stale.
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<u64> {
        let stored = self.stored_at()?;
        Some((now - stored).num_seconds().max(0) as u64)
    }

    /// Fresh under the `max-age` stamped at insertion, else `default_ttl`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, default_ttl: Duration) -> bool {
        let ttl = ttl_from_headers(&self.headers, default_ttl);
        matches!(self.age_at(now), Some(age) if age < ttl.as_secs())
    }
}

/// Exact-key response store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError>;

    /// Store `entry`, replacing any previous entry under `key`.
    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), StoreError>;

    /// Remove the entry; `Ok(false)` when nothing was stored.
    async fn delete(&self, key: &CacheKey) -> Result<bool, StoreError>;
}

/// Process-local cache store.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    inner: Arc<DashMap<CacheKey, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop entries that could only be served as misses. Returns how many
    /// were removed.
    pub fn purge_stale(&self, default_ttl: Duration) -> usize {
        let now = Utc::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.is_fresh_at(now, default_ttl));
        before.saturating_sub(self.inner.len())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), StoreError> {
        self.inner.insert(key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, StoreError> {
        Ok(self.inner.remove(key).is_some())
    }
}
