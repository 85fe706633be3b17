//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, headers, body)
//!     → context.rs (build per-request Context)
//!     → middleware.rs (run chain in registration order)
//!     → router.rs (ordered route scan)
//!     → matcher.rs (anchored template match, capture params)
//!     → Return: handler response, 404, or 500
//!
//! Route Compilation (at startup):
//!     (method, template, handler)[]
//!     → Compile templates
//!     → Append in registration order
//!     → Freeze inside the Dispatcher
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (registration order, never re-sorted)

pub mod context;
pub mod matcher;
pub mod middleware;
pub mod router;

pub use context::Context;
pub use matcher::{CompiledPattern, PathParams, PatternError};
pub use middleware::{from_fn, EdgeMetadata, Middleware};
pub use router::{Handler, HandlerResult, IntoHandler, RouteMethod, Router};
