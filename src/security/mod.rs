//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_control.rs (country deny-list)
//!     → rate_limit.rs (per-client counters)
//!     → Pass to routing
//! Outgoing response:
//!     → headers.rs (security header set)
//! ```
//!
//! # Design Decisions
//! - Deny-list and limiter run before any routing work
//! - Limiter availability policy is explicit (`fail_open`)
//! - Security headers on every response, including rejections

pub mod access_control;
pub mod headers;
pub mod rate_limit;

pub use access_control::CountryFilter;
pub use headers::SecurityHeaders;
pub use rate_limit::{RateLimitDecision, RateLimiter};
