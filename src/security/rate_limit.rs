//! Per-client request counting with a rolling window.
//!
//! Counters live in a [`KeyValueStore`] under `rate_limit:<client>`. Every
//! admitted request rewrites the counter with the full window TTL, so the
//! window extends while a client keeps sending. The store's expiry is the only
//! reset path.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RateLimitConfig;
use crate::store::KeyValueStore;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub admitted: bool,
    /// Requests counted in the current window, including this one when admitted.
    pub count: u64,
    pub limit: u64,
    /// True when no counter was consulted (store unbound or failing).
    pub bypassed: bool,
}

impl RateLimitDecision {
    /// Requests left in the current window.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }
}

/// Fixed-threshold limiter over an optional key-value store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Option<Arc<dyn KeyValueStore>>,
    threshold: u64,
    window: Duration,
    fail_open: bool,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("bound", &self.store.is_some())
            .field("threshold", &self.threshold)
            .field("window", &self.window)
            .field("fail_open", &self.fail_open)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(
        store: Option<Arc<dyn KeyValueStore>>,
        threshold: u64,
        window: Duration,
        fail_open: bool,
    ) -> Self {
        Self {
            store,
            threshold,
            window,
            fail_open,
        }
    }

    pub fn from_config(store: Option<Arc<dyn KeyValueStore>>, config: &RateLimitConfig) -> Self {
        Self::new(
            store,
            config.threshold,
            Duration::from_secs(config.window_secs),
            config.fail_open,
        )
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject one request from `client`.
    pub async fn admit(&self, client: &str) -> bool {
        self.check(client).await.admitted
    }

    /// Count one request from `client` and report the decision.
    ///
    /// At most `threshold` requests are admitted per window; rejected requests
    /// are not counted.
    pub async fn check(&self, client: &str) -> RateLimitDecision {
        let Some(store) = &self.store else {
            return self.unavailable(client, "store unbound");
        };
        let key = format!("rate_limit:{client}");

        let current = match store.get(&key).await {
            Ok(value) => value.and_then(|v| match v.parse::<u64>() {
                Ok(count) => Some(count),
                Err(_) => {
                    tracing::warn!(key = %key, value = %v, "Unparsable rate counter, restarting window");
                    None
                }
            }),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Rate limit store read failed");
                return self.unavailable(client, "store read failed");
            }
        };

        let count = match current {
            Some(count) if count >= self.threshold => {
                tracing::debug!(client = %client, count, limit = self.threshold, "Rate limit exceeded");
                return RateLimitDecision {
                    admitted: false,
                    count,
                    limit: self.threshold,
                    bypassed: false,
                };
            }
            Some(count) => count + 1,
            None => 1,
        };

        if let Err(e) = store.put(&key, count.to_string(), self.window).await {
            tracing::warn!(key = %key, error = %e, "Rate limit store write failed");
            return self.unavailable(client, "store write failed");
        }

        RateLimitDecision {
            admitted: true,
            count,
            limit: self.threshold,
            bypassed: false,
        }
    }

    fn unavailable(&self, client: &str, reason: &'static str) -> RateLimitDecision {
        if !self.fail_open {
            tracing::warn!(client = %client, reason, "Rate limiter failing closed");
        }
        RateLimitDecision {
            admitted: self.fail_open,
            count: 0,
            limit: self.threshold,
            bypassed: true,
        }
    }
}
