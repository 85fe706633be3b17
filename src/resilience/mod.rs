//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to origin:
//!     → timeouts.rs (every origin fetch runs under a deadline)
//!     → on expiry the fetch future is dropped, which cancels it
//!     → caller maps the failure to 503 + Retry-After
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries at the edge: a failed fetch is reported, not repeated
//! - Timeout errors are distinct from other errors

pub mod timeouts;

pub use timeouts::{with_deadline, DeadlineExceeded};
