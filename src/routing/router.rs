//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Run the middleware chain for every request
//! - Dispatch to the first route whose method and pattern match
//! - Convert handler and middleware faults into 500 responses
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc without locks)
//! - O(n) ordered scan; overlapping templates rely on registration order
//! - Explicit 404 rather than a silent default
//! - Panics inside handlers are caught at this boundary

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use futures_util::FutureExt;

use crate::error::EdgeError;
use crate::http::request::request_id_of;
use crate::http::response::{error_response, DEFAULT_BODY_LIMIT};
use crate::routing::context::Context;
use crate::routing::matcher::CompiledPattern;
use crate::routing::middleware::Middleware;

/// Result every handler produces.
pub type HandlerResult = Result<Response, EdgeError>;

/// Boxed future returned by a type-erased handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Type-erased, shareable route handler.
pub type Handler = Arc<dyn Fn(Context) -> HandlerFuture + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Implemented for any `Fn(Context) -> impl Future<Output = HandlerResult>`.
pub trait IntoHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> HandlerFuture;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context) -> HandlerFuture {
        Box::pin((self)(ctx))
    }
}

/// Method filter of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMethod {
    /// Matches every verb.
    Any,
    Exact(Method),
}

impl RouteMethod {
    pub fn accepts(&self, method: &Method) -> bool {
        match self {
            RouteMethod::Any => true,
            RouteMethod::Exact(m) => m == method,
        }
    }
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        RouteMethod::Exact(method)
    }
}

struct Route {
    method: RouteMethod,
    pattern: CompiledPattern,
    handler: Handler,
}

/// Ordered route table with a middleware chain.
pub struct Router {
    routes: Vec<Route>,
    middleware: Vec<Arc<dyn Middleware>>,
    body_limit: usize,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field(
                "routes",
                &self
                    .routes
                    .iter()
                    .map(|r| (r.method.clone(), r.pattern.template().to_string()))
                    .collect::<Vec<_>>(),
            )
            .field("middleware", &self.middleware.len())
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            middleware: Vec::new(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Maximum request body size buffered into the context.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Append middleware; append order is execution order.
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Compile `template` and append a route.
    pub fn route(
        &mut self,
        method: impl Into<RouteMethod>,
        template: &str,
        handler: impl IntoHandler,
    ) -> Result<&mut Self, EdgeError> {
        let pattern = CompiledPattern::compile(template)?;
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        self.routes.push(Route {
            method: method.into(),
            pattern,
            handler,
        });
        Ok(self)
    }

    pub fn get(&mut self, template: &str, handler: impl IntoHandler) -> Result<&mut Self, EdgeError> {
        self.route(Method::GET, template, handler)
    }

    pub fn post(&mut self, template: &str, handler: impl IntoHandler) -> Result<&mut Self, EdgeError> {
        self.route(Method::POST, template, handler)
    }

    pub fn put(&mut self, template: &str, handler: impl IntoHandler) -> Result<&mut Self, EdgeError> {
        self.route(Method::PUT, template, handler)
    }

    pub fn delete(&mut self, template: &str, handler: impl IntoHandler) -> Result<&mut Self, EdgeError> {
        self.route(Method::DELETE, template, handler)
    }

    pub fn patch(&mut self, template: &str, handler: impl IntoHandler) -> Result<&mut Self, EdgeError> {
        self.route(Method::PATCH, template, handler)
    }

    pub fn head(&mut self, template: &str, handler: impl IntoHandler) -> Result<&mut Self, EdgeError> {
        self.route(Method::HEAD, template, handler)
    }

    /// Register a route matching every method.
    pub fn any(&mut self, template: &str, handler: impl IntoHandler) -> Result<&mut Self, EdgeError> {
        self.route(RouteMethod::Any, template, handler)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Handle a request: middleware, first matching route, or 404.
    ///
    /// Never fails: middleware and handler errors, including panics, become
    /// 500 responses.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let path = request.uri().path().to_string();
        let early_id = request_id_of(request.headers());
        let ctx = match Context::from_request(request, self.body_limit).await {
            Ok(ctx) => ctx,
            Err(e) => {
                let request_id = early_id.as_deref().unwrap_or("unknown");
                return e.into_response_for(request_id, Some(&path));
            }
        };
        let request_id = ctx.request_id().to_string();

        match AssertUnwindSafe(self.dispatch(ctx)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(request_id = %request_id, path = %path, error = %e, "Handler failed");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred at the edge",
                    &request_id,
                    Some(&path),
                )
            }
            Err(_) => {
                tracing::error!(request_id = %request_id, path = %path, "Handler panicked");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred at the edge",
                    &request_id,
                    Some(&path),
                )
            }
        }
    }

    async fn dispatch(&self, mut ctx: Context) -> HandlerResult {
        for middleware in &self.middleware {
            middleware.apply(&mut ctx).await?;
        }

        for route in &self.routes {
            if !route.method.accepts(ctx.method()) {
                continue;
            }
            if let Some(params) = route.pattern.matches(ctx.path()) {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    template = %route.pattern.template(),
                    "Route matched"
                );
                ctx.set_params(params);
                return (route.handler)(ctx).await;
            }
        }

        tracing::debug!(request_id = %ctx.request_id(), path = %ctx.path(), "No route matched");
        Ok(error_response(
            StatusCode::NOT_FOUND,
            "No matching route found",
            ctx.request_id(),
            Some(ctx.path()),
        ))
    }
}
