//! Collector configuration.

use std::time::Duration;

use serde::Deserialize;
use tracking_core::limits::MAX_BATCH_EVENTS;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Base URL of the ingestion API.
    pub endpoint: String,
    /// Repeat clicks on one element inside this window fold into one event.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Buffered interactions that trigger an immediate send.
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_max_batch() -> usize {
    20
}

fn default_flush_interval_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl CollectorConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            debounce_ms: default_debounce_ms(),
            max_batch: default_max_batch(),
            flush_interval_ms: default_flush_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Batch size clamped to what the API accepts in one request.
    pub fn batch_limit(&self) -> usize {
        self.max_batch.clamp(1, MAX_BATCH_EVENTS)
    }
}
