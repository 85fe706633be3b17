//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum, tower-http layers, dispatcher hot swap)
//!     → dispatcher.rs (request ID, client identity, country filter,
//!       rate limiter, security headers)
//!     → routing::Router (middleware chain, first matching route)
//!     → handlers.rs (health, API proxy, static site)
//!     → response.rs (buffered origin replies, JSON errors)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::{Dispatcher, EdgeStores};
pub use request::{ClientIdentity, X_REQUEST_ID};
pub use response::BufferedResponse;
pub use server::HttpServer;
