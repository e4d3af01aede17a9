//! Best-effort wrappers used on the ingestion and dashboard paths.
//!
//! A cache failure is counted, marks the cache degraded, and is logged at
//! warn. It is never returned to the caller.

use std::time::Duration;

use chrono::{DateTime, Utc};
use telemetry::{health, metrics};
use tracing::warn;
use tracking_core::{Error, InteractionEvent};

use crate::cache::{CacheCounters, ClickRecord, SessionCache};

fn degrade(op: &'static str, session_id: Option<&str>, e: Error) {
    let e = match e {
        e @ Error::CacheUnavailable(_) => e,
        other => Error::cache_unavailable(other.to_string()),
    };
    metrics().cache_failures.inc();
    health().cache.set_unhealthy(e.to_string());
    warn!(op = op, session_id = session_id.unwrap_or("-"), error = %e, "Session cache unavailable");
}

fn recovered() {
    if !health().cache.is_healthy() {
        health().cache.set_healthy();
    }
}

/// Mirror an accepted batch into the cache: every session is marked active
/// and every click lands in its timeline.
pub async fn mirror_interactions(cache: &dyn SessionCache, events: &[InteractionEvent]) {
    for event in events {
        if let Err(e) = cache.mark_active(&event.session_id, event.timestamp).await {
            degrade("mark_active", Some(&event.session_id), e);
            return;
        }
        if event.event_type == tracking_core::event_types::CLICK {
            if let Err(e) = cache
                .record_click(&event.session_id, ClickRecord::from_event(event))
                .await
            {
                degrade("record_click", Some(&event.session_id), e);
                return;
            }
        }
    }
    recovered();
}

pub async fn mark_active_or_warn(cache: &dyn SessionCache, session_id: &str, at: DateTime<Utc>) {
    match cache.mark_active(session_id, at).await {
        Ok(()) => recovered(),
        Err(e) => degrade("mark_active", Some(session_id), e),
    }
}

pub async fn counters_or_default(
    cache: &dyn SessionCache,
    window: Duration,
    now: DateTime<Utc>,
) -> CacheCounters {
    match cache.snapshot_counters(window, now).await {
        Ok(counters) => {
            recovered();
            counters
        }
        Err(e) => {
            degrade("snapshot_counters", None, e);
            CacheCounters::default()
        }
    }
}

pub async fn clicks_or_empty(cache: &dyn SessionCache, session_id: &str) -> Vec<ClickRecord> {
    match cache.recent_clicks(session_id).await {
        Ok(clicks) => clicks,
        Err(e) => {
            degrade("recent_clicks", Some(session_id), e);
            Vec::new()
        }
    }
}
