//! Edge Request Dispatcher
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                  EDGE DISPATCHER                 │
//!                          │                                                  │
//!     Client Request       │  ┌─────────┐   ┌────────────┐   ┌────────────┐   │
//!     ─────────────────────┼─▶│  http   │──▶│ dispatcher │──▶│  routing   │   │
//!                          │  │ server  │   │ country/RL │   │ middleware │   │
//!                          │  └─────────┘   └────────────┘   └─────┬──────┘   │
//!                          │                                       │          │
//!                          │                                       ▼          │
//!                          │                 ┌────────────┐   ┌────────────┐  │
//!                          │                 │   cache    │◀──│  handlers  │  │
//!                          │                 │   aside    │   └─────┬──────┘  │
//!                          │                 └────────────┘         │         │
//!     Client Response      │                                        ▼         │
//!     ◀────────────────────┼────────────────────────────────── ┌──────────┐   │
//!                          │                                   │  origin  │◀──┼──── Backend /
//!                          │                                   └──────────┘   │     Static site
//!                          │  ┌────────────────────────────────────────────┐  │
//!                          │  │ config · observability · lifecycle · store │  │
//!                          │  └────────────────────────────────────────────┘  │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_dispatch::cache::MemoryCacheStore;
use edge_dispatch::config::{load_config, ConfigWatcher, EdgeConfig};
use edge_dispatch::observability::{logging, metrics};
use edge_dispatch::origin::HttpOrigin;
use edge_dispatch::store::MemoryKv;
use edge_dispatch::{EdgeStores, HttpServer, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "edge-dispatch", version, about = "Edge request dispatcher")]
struct Cli {
    /// TOML configuration file; watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EdgeConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!("edge-dispatch v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend_url = %config.origin.backend_url,
        static_url = %config.origin.static_url,
        rate_limit = config.rate_limit.threshold,
        window_secs = config.rate_limit.window_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let kv = MemoryKv::new();
    let cache = MemoryCacheStore::new();
    let stores = EdgeStores {
        cache: Arc::new(cache.clone()),
        kv: Some(Arc::new(kv.clone())),
    };
    let default_ttl = config.cache.ttl();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            kv.purge_expired();
            let purged = cache.purge_stale(default_ttl);
            if purged > 0 {
                tracing::debug!(purged, remaining = cache.len(), "Purged stale cache entries");
            }
        }
    });
    let origin = Arc::new(HttpOrigin::new(config.origin.timeout())?);

    // Keep the watcher alive for the life of the server.
    let (config_updates, _watcher) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signals = shutdown.clone();
    tokio::spawn(async move { signals.trigger_on_signal().await });

    let server = HttpServer::new(config, stores, origin)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
