//! Edge request dispatcher library.
//!
//! Pattern routing, a middleware chain, cache-aside over an origin, and
//! per-client rate limiting, served over axum.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod origin;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod store;

pub use config::schema::EdgeConfig;
pub use error::EdgeError;
pub use http::{Dispatcher, EdgeStores, HttpServer};
pub use lifecycle::Shutdown;
