//! Visitor tracking and analytics engine.
//!
//! One process serving:
//! - Interaction, selection, snapshot and metric ingestion (dual-write to the
//!   durable store and the session cache)
//! - Beacon-compatible session finalization and conversion signals
//! - Dashboard analytics (bounce, funnels, bot classification, GA4 alignment)
//! - Background idle sweep and metrics flush

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use analytics::AnalyticsConfig;
use api::{router, AppState};
use event_store::StoreConfig;
use session_cache::{CacheConfig, MokaSessionCache};
use telemetry::{health, init_tracing, LogConfig, TracingConfig};
use worker::{probe_store, WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    store: StoreConfig,

    #[serde(default)]
    cache: CacheConfig,

    #[serde(default)]
    analytics: AnalyticsConfig,

    #[serde(default)]
    worker: WorkerConfig,

    #[serde(default)]
    log: LogConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = load_config()?;

    init_tracing(TracingConfig::from(&config.log));

    info!("Starting visitor tracking engine v{}", env!("CARGO_PKG_VERSION"));
    info!(
        backend = ?config.store.backend,
        idle_hours = config.worker.sweep.idle_hours,
        "Loaded configuration"
    );

    let store = event_store::connect(&config.store)
        .await
        .context("Failed to connect to the event store")?;

    if probe_store(store.as_ref()).await {
        info!("Event store: healthy");
    } else {
        // Readiness stays down until the periodic probe succeeds.
        error!("Event store: unhealthy");
    }

    let cache = Arc::new(MokaSessionCache::new(&config.cache));
    health().cache.set_healthy();

    // Background workers
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Arc::new(WorkerScheduler::new(config.worker.clone(), store.clone()));
    let worker_handles = scheduler.start(shutdown_rx);

    let state = AppState::new(store.clone(), cache, config.analytics.clone());
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");

    if shutdown_tx.send(true).is_err() {
        warn!("Workers already stopped");
    }
    for handle in worker_handles {
        if let Err(e) = handle.await {
            error!("Worker task failed: {}", e);
        }
    }

    // Last flush so counters from the final interval are kept
    if let Err(e) = worker::flush_metrics(store.as_ref(), chrono::Utc::now()).await {
        error!("Failed to flush metrics: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
///
/// Later sources win: `config/default.toml`, then `TRACKING_*` variables with
/// `__` between nested keys (e.g. `TRACKING_STORE__BACKEND=memory`).
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::with_prefix("TRACKING")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("analytics.bots.extra_patterns")
                .with_list_parse_key("analytics.completion.required")
                .with_list_parse_key("analytics.completion.optional")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
