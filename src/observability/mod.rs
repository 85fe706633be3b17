//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and histograms via `metrics`)
//!
//! Consumers:
//!     → stdout (pretty for development, JSON for aggregation)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Request ID is attached to every request-scoped event
//! - Metrics are no-ops until a recorder is installed, so tests need no setup
//! - Label sets stay small: method, status class, outcome

pub mod logging;
pub mod metrics;
