//! Storage collaborators.
//!
//! # Data Flow
//! ```text
//! security::rate_limit ──► KeyValueStore (counters with expiry)
//! cache::aside        ──► cache::store::CacheStore (response entries)
//! ```
//!
//! # Design Decisions
//! - Stores are traits; the dispatcher never assumes a backend
//! - In-memory implementations are concurrent (DashMap) and process-local
//! - Store failures surface as [`StoreError`], callers decide the policy

pub mod kv;

pub use kv::{KeyValueStore, MemoryKv};

/// Failure reported by a backing store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the operation.
    #[error("store operation failed: {0}")]
    Failed(String),
}
