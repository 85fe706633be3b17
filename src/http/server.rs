//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum app: one fallback handler feeding the [`Dispatcher`]
//! - Wire up tower-http layers (tracing, request ID, timeout)
//! - Stamp security headers on replies made outside the dispatcher (timeouts)
//! - Swap the dispatcher atomically on config reload
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::map_response_with_state,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::EdgeConfig;
use crate::error::EdgeError;
use crate::http::dispatcher::{Dispatcher, EdgeStores};
use crate::origin::OriginFetcher;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ArcSwap<Dispatcher>>,
}

/// HTTP server for the edge dispatcher.
pub struct HttpServer {
    config: EdgeConfig,
    stores: EdgeStores,
    origin: Arc<dyn OriginFetcher>,
    dispatcher: Arc<ArcSwap<Dispatcher>>,
}

impl HttpServer {
    /// Create a server with the given configuration and long-lived collaborators.
    pub fn new(
        config: EdgeConfig,
        stores: EdgeStores,
        origin: Arc<dyn OriginFetcher>,
    ) -> Result<Self, EdgeError> {
        let dispatcher = Dispatcher::new(&config, stores.clone(), origin.clone())?;
        Ok(Self {
            config,
            stores,
            origin,
            dispatcher: Arc::new(ArcSwap::from_pointee(dispatcher)),
        })
    }

    /// Build the axum app with all middleware layers.
    pub fn app(&self) -> Router {
        let state = AppState {
            dispatcher: self.dispatcher.clone(),
        };
        let timeout = Duration::from_secs(self.config.listener.request_timeout_secs);

        Router::new()
            .fallback(edge_handler)
            .with_state(state.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(map_response_with_state(state, apply_security_headers))
                    .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)),
            )
    }

    /// The dispatcher currently serving requests.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.load_full()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configs received on `config_updates` rebuild the dispatcher; listener
    /// settings only take effect on restart.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.app().into_make_service_with_connect_info::<SocketAddr>();

        let slot = self.dispatcher.clone();
        let stores = self.stores.clone();
        let origin = self.origin.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match Dispatcher::new(&config, stores.clone(), origin.clone()) {
                    Ok(dispatcher) => {
                        slot.store(Arc::new(dispatcher));
                        tracing::info!("Configuration reloaded");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected reloaded configuration, keeping current");
                    }
                }
            }
        });

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }
}

/// Forwards every request, with its peer address, to the current dispatcher.
async fn edge_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let dispatcher = state.dispatcher.load_full();
    dispatcher.dispatch(request, peer).await
}

/// Security headers for every reply, including the timeout layer's own.
async fn apply_security_headers(State(state): State<AppState>, mut response: Response) -> Response {
    state
        .dispatcher
        .load()
        .security_headers()
        .apply(response.headers_mut());
    response
}
