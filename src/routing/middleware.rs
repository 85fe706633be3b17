//! Middleware run by the router before route lookup.
//!
//! Middleware execute in registration order, each with mutable access to the
//! [`Context`]. They do not wrap the handler: the chain always runs to the end
//! unless one of them fails, which aborts the request with a 500.

use async_trait::async_trait;
use axum::http::HeaderValue;

use crate::error::EdgeError;
use crate::routing::context::Context;

/// A step in the router's middleware chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn apply(&self, ctx: &mut Context) -> Result<(), EdgeError>;
}

/// Adapter turning a synchronous closure into a [`Middleware`].
pub struct FnMiddleware<F> {
    f: F,
}

/// Wrap a closure as middleware.
///
/// ```
/// use edge_dispatch::routing::{middleware, Router};
///
/// let mut router = Router::new();
/// router.use_middleware(middleware::from_fn(|ctx| {
///     ctx.set_response_header("x-powered-by", "edge".parse().unwrap());
///     Ok(())
/// }));
/// ```
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&mut Context) -> Result<(), EdgeError> + Send + Sync + 'static,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut Context) -> Result<(), EdgeError> + Send + Sync + 'static,
{
    async fn apply(&self, ctx: &mut Context) -> Result<(), EdgeError> {
        (self.f)(ctx)
    }
}

/// Region the edge node reports for itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRegion(pub String);

/// Stamps the node's region onto the context and the response.
#[derive(Debug, Clone)]
pub struct EdgeMetadata {
    region: String,
}

impl EdgeMetadata {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

#[async_trait]
impl Middleware for EdgeMetadata {
    async fn apply(&self, ctx: &mut Context) -> Result<(), EdgeError> {
        let value = HeaderValue::from_str(&self.region)
            .map_err(|_| EdgeError::internal(format!("invalid region '{}'", self.region)))?;
        ctx.set_response_header("x-edge-region", value);
        ctx.extensions_mut().insert(EdgeRegion(self.region.clone()));
        Ok(())
    }
}
