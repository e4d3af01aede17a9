//! The `SessionCache` contract.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracking_core::{InteractionEvent, Result};

/// One entry in a session's live click timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickRecord {
    pub element_id: Option<String>,
    pub category: String,
    /// Clicks folded into this record by the collector's debounce.
    pub click_count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl ClickRecord {
    pub fn from_event(event: &InteractionEvent) -> Self {
        Self {
            element_id: event.element_id.clone(),
            category: event.category.clone(),
            click_count: event.additional_data.click_count().max(1),
            timestamp: event.timestamp,
        }
    }
}

/// Coarse real-time counts read straight from cache entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheCounters {
    /// Sessions active within the requested window.
    pub active: u64,
    /// Distinct sessions seen since midnight UTC.
    pub today: u64,
}

/// Low-latency, TTL-bounded session state.
///
/// Implementations may lose data at any time. Callers on the ingestion path
/// go through the helpers in [`crate::best_effort`] so a failing cache never
/// fails a durable write.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Refresh the session's membership in the active set. Idempotent.
    async fn mark_active(&self, session_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Append a click to the session's bounded timeline.
    async fn record_click(&self, session_id: &str, click: ClickRecord) -> Result<()>;

    /// The session's click timeline, oldest first.
    async fn recent_clicks(&self, session_id: &str) -> Result<Vec<ClickRecord>>;

    async fn snapshot_counters(&self, window: Duration, now: DateTime<Utc>) -> Result<CacheCounters>;
}
