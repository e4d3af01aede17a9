//! Single runs of the periodic jobs.

use chrono::{DateTime, Utc};
use event_store::EventStore;
use telemetry::{health, metrics};
use tracing::{debug, warn};
use tracking_core::{PerformanceMetric, Result};

/// Write the current counters as server-side performance metrics.
pub async fn flush_metrics(store: &dyn EventStore, now: DateTime<Utc>) -> Result<usize> {
    let snapshot = metrics().snapshot();
    let rows: Vec<PerformanceMetric> = snapshot
        .samples()
        .into_iter()
        .map(|(name, value)| PerformanceMetric::server(name, value, now))
        .collect();

    let written = store.append_metrics(&rows).await?;
    debug!(rows = written, "Flushed server metrics");
    Ok(written)
}

/// Check the store and record the result for readiness.
pub async fn probe_store(store: &dyn EventStore) -> bool {
    match store.health_check().await {
        Ok(()) => {
            if !health().store.is_healthy() {
                health().store.set_healthy();
                debug!("Store healthy");
            }
            true
        }
        Err(e) => {
            warn!(error = %e, "Store health check failed");
            health().store.set_unhealthy(e.to_string());
            false
        }
    }
}
