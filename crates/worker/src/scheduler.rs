//! Worker scheduler for background tasks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use event_store::{sweep_idle_sessions, EventStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::config::WorkerConfig;
use crate::jobs::{flush_metrics, probe_store};

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    store: Arc<dyn EventStore>,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig, store: Arc<dyn EventStore>) -> Self {
        Self { config, store }
    }

    /// Starts all background workers. They stop when `shutdown` flips to true.
    pub fn start(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = self.clone();
        handles.push(spawn_periodic(
            "idle_sweep",
            self.config.sweep_interval(),
            shutdown.clone(),
            move || {
                let scheduler = scheduler.clone();
                async move { scheduler.run_sweep().await }
            },
        ));

        let scheduler = self.clone();
        handles.push(spawn_periodic(
            "metrics_flush",
            self.config.metrics_flush_interval(),
            shutdown.clone(),
            move || {
                let scheduler = scheduler.clone();
                async move { scheduler.run_metrics_flush().await }
            },
        ));

        let scheduler = self.clone();
        handles.push(spawn_periodic(
            "store_health",
            self.config.health_interval(),
            shutdown,
            move || {
                let scheduler = scheduler.clone();
                async move {
                    probe_store(scheduler.store.as_ref()).await;
                }
            },
        ));

        info!("Background workers started");
        handles
    }

    async fn run_sweep(&self) {
        if let Err(e) = sweep_idle_sessions(self.store.as_ref(), &self.config.sweep, Utc::now()).await {
            error!("Idle sweep error: {}", e);
        }
    }

    async fn run_metrics_flush(&self) {
        if let Err(e) = flush_metrics(self.store.as_ref(), Utc::now()).await {
            error!("Failed to flush metrics: {}", e);
        }
    }
}

fn spawn_periodic<F, Fut>(
    name: &'static str,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => job().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(worker = name, "Worker stopped");
                        return;
                    }
                }
            }
        }
    })
}
