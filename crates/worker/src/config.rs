//! Worker scheduling configuration.

use std::time::Duration;

use event_store::SweepPolicy;
use serde::Deserialize;

/// `[worker]` section of the service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub sweep: SweepPolicy,
    /// Idle sweep interval
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Metrics flush interval
    #[serde(default = "default_metrics_flush_interval")]
    pub metrics_flush_interval_secs: u64,
    /// Store health probe interval
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_metrics_flush_interval() -> u64 {
    60
}

fn default_health_interval() -> u64 {
    15
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sweep: SweepPolicy::default(),
            sweep_interval_secs: default_sweep_interval(),
            metrics_flush_interval_secs: default_metrics_flush_interval(),
            health_interval_secs: default_health_interval(),
        }
    }
}

impl WorkerConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn metrics_flush_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_flush_interval_secs.max(1))
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs.max(1))
    }
}
