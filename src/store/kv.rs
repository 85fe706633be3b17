//! Key-value store used for rate-limit counters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::store::StoreError;

/// String key-value store with per-entry expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Current value, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value`, expiring after `ttl`.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Instant,
}

/// Process-local store backed by a concurrent map.
///
/// Expiry uses tokio's clock so paused-time tests can advance it.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    inner: Arc<DashMap<String, Slot>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.inner.retain(|_, slot| slot.expires_at > now);
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let expired = match self.inner.get(key) {
            Some(slot) if slot.expires_at > now => return Ok(Some(slot.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.inner.remove_if(key, |_, slot| slot.expires_at <= now);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        self.inner.insert(
            key.to_string(),
            Slot {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_get_put_expiry() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("k").await.unwrap(), None);

        kv.put("k", "1".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("1"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("1"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(kv.get("k").await.unwrap(), None);
        assert!(kv.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_resets_expiry() {
        let kv = MemoryKv::new();
        kv.put("k", "1".into(), Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        kv.put("k", "2".into(), Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let kv = MemoryKv::new();
        kv.put("a", "1".into(), Duration::from_secs(1)).await.unwrap();
        kv.put("b", "1".into(), Duration::from_secs(100)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        kv.purge_expired();
        assert_eq!(kv.len(), 1);
    }
}
