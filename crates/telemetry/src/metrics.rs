//! Internal metrics collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements without wrapping below zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the tracking engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingestion
    pub requests_received: Counter,
    pub interactions_received: Counter,
    pub interactions_accepted: Counter,
    pub interactions_rejected: Counter,
    pub selections_recorded: Counter,
    pub snapshots_recorded: Counter,
    pub metrics_recorded: Counter,
    pub sessions_created: Counter,

    // Durable store
    pub store_writes: Counter,
    pub store_write_errors: Counter,
    pub store_query_errors: Counter,

    // Ephemeral cache
    pub cache_failures: Counter,

    // Finalization
    pub finalize_writes: Counter,
    pub finalize_noops: Counter,
    pub conversions: Counter,

    // Idle sweep
    pub sweep_runs: Counter,
    pub sweep_abandoned: Counter,
    pub sweep_completed: Counter,

    // Latency histograms
    pub ingest_latency_ms: Histogram,
    pub store_latency_ms: Histogram,
    pub analytics_latency_ms: Histogram,

    // Gauges
    pub active_connections: Gauge,
    pub cached_active_sessions: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub requests_received: u64,
    pub interactions_received: u64,
    pub interactions_accepted: u64,
    pub interactions_rejected: u64,
    pub sessions_created: u64,
    pub store_writes: u64,
    pub store_write_errors: u64,
    pub cache_failures: u64,
    pub finalize_writes: u64,
    pub finalize_noops: u64,
    pub conversions: u64,
    pub sweep_abandoned: u64,
    pub sweep_completed: u64,
    pub ingest_latency_mean_ms: f64,
    pub store_latency_mean_ms: f64,
    pub analytics_latency_mean_ms: f64,
    pub active_connections: u64,
    pub cached_active_sessions: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            requests_received: self.requests_received.get(),
            interactions_received: self.interactions_received.get(),
            interactions_accepted: self.interactions_accepted.get(),
            interactions_rejected: self.interactions_rejected.get(),
            sessions_created: self.sessions_created.get(),
            store_writes: self.store_writes.get(),
            store_write_errors: self.store_write_errors.get(),
            cache_failures: self.cache_failures.get(),
            finalize_writes: self.finalize_writes.get(),
            finalize_noops: self.finalize_noops.get(),
            conversions: self.conversions.get(),
            sweep_abandoned: self.sweep_abandoned.get(),
            sweep_completed: self.sweep_completed.get(),
            ingest_latency_mean_ms: self.ingest_latency_ms.mean(),
            store_latency_mean_ms: self.store_latency_ms.mean(),
            analytics_latency_mean_ms: self.analytics_latency_ms.mean(),
            active_connections: self.active_connections.get(),
            cached_active_sessions: self.cached_active_sessions.get(),
        }
    }
}

impl MetricsSnapshot {
    /// Flattens the snapshot into named samples, one per metric row.
    pub fn samples(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("server.requests_received", self.requests_received as f64),
            ("server.interactions_received", self.interactions_received as f64),
            ("server.interactions_accepted", self.interactions_accepted as f64),
            ("server.interactions_rejected", self.interactions_rejected as f64),
            ("server.sessions_created", self.sessions_created as f64),
            ("server.store_writes", self.store_writes as f64),
            ("server.store_write_errors", self.store_write_errors as f64),
            ("server.cache_failures", self.cache_failures as f64),
            ("server.finalize_writes", self.finalize_writes as f64),
            ("server.finalize_noops", self.finalize_noops as f64),
            ("server.conversions", self.conversions as f64),
            ("server.sweep_abandoned", self.sweep_abandoned as f64),
            ("server.sweep_completed", self.sweep_completed as f64),
            ("server.ingest_latency_mean_ms", self.ingest_latency_mean_ms),
            ("server.store_latency_mean_ms", self.store_latency_mean_ms),
            ("server.analytics_latency_mean_ms", self.analytics_latency_mean_ms),
            ("server.active_connections", self.active_connections as f64),
            ("server.cached_active_sessions", self.cached_active_sessions as f64),
        ]
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
