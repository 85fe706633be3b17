//! Edge response caching.
//!
//! # Data Flow
//! ```text
//! handler
//!     → aside.rs (key from URL or explicit name)
//!     → store.rs lookup → fresh? ── yes ──► HIT response (X-Cache-Age)
//!                          │
//!                          no
//!                          ▼
//!     fetcher (origin) → storable? → stamp X-Cache-Time, store → MISS response
//! ```
//!
//! # Design Decisions
//! - Freshness lives in the stored headers, not in store-side expiry
//! - policy.rs decides cacheability for static assets
//! - Concurrent misses on one key may fetch twice; last write wins

pub mod aside;
pub mod policy;
pub mod store;

pub use aside::{CacheAside, CacheOptions, X_CACHE_AGE, X_CACHE_STATUS};
pub use policy::{is_storable, should_cache, ttl_from_headers};
pub use store::{CacheEntry, CacheKey, CacheStore, MemoryCacheStore, X_CACHE_TIME};
