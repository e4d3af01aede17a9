//! In-process cache on moka.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use moka::future::Cache;
use parking_lot::Mutex;
use telemetry::metrics;
use tracing::debug;
use tracking_core::Result;

use crate::cache::{CacheCounters, ClickRecord, SessionCache};
use crate::config::CacheConfig;

/// Day-membership entries outlive a UTC day boundary, then age out.
const SEEN_TODAY_TTL: Duration = Duration::from_secs(48 * 60 * 60);

type ClickList = Arc<Mutex<VecDeque<ClickRecord>>>;

/// moka-backed [`SessionCache`].
///
/// Active membership uses time-to-idle, so every `mark_active` slides the
/// window forward.
#[derive(Clone)]
pub struct MokaSessionCache {
    active: Cache<String, DateTime<Utc>>,
    seen: Cache<String, NaiveDate>,
    clicks: Cache<String, ClickList>,
    max_clicks: usize,
}

impl MokaSessionCache {
    pub fn new(config: &CacheConfig) -> Self {
        debug!(
            active_ttl_secs = config.active_ttl_secs,
            max_sessions = config.max_sessions,
            "Creating session cache"
        );

        Self {
            active: Cache::builder()
                .max_capacity(config.max_sessions)
                .time_to_idle(config.active_ttl())
                .build(),
            seen: Cache::builder()
                .max_capacity(config.max_sessions)
                .time_to_live(SEEN_TODAY_TTL)
                .build(),
            clicks: Cache::builder()
                .max_capacity(config.max_sessions)
                .time_to_idle(config.click_ttl())
                .build(),
            max_clicks: config.max_clicks_per_session.max(1),
        }
    }
}

impl Default for MokaSessionCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[async_trait]
impl SessionCache for MokaSessionCache {
    async fn mark_active(&self, session_id: &str, at: DateTime<Utc>) -> Result<()> {
        let key = session_id.to_string();
        let last_seen = match self.active.get(&key).await {
            Some(prev) if prev > at => prev,
            _ => at,
        };
        self.active.insert(key.clone(), last_seen).await;
        self.seen.insert(key, last_seen.date_naive()).await;
        Ok(())
    }

    async fn record_click(&self, session_id: &str, click: ClickRecord) -> Result<()> {
        let list = self
            .clicks
            .get_with(session_id.to_string(), async {
                Arc::new(Mutex::new(VecDeque::new()))
            })
            .await;

        let mut list = list.lock();
        list.push_back(click);
        while list.len() > self.max_clicks {
            list.pop_front();
        }
        Ok(())
    }

    async fn recent_clicks(&self, session_id: &str) -> Result<Vec<ClickRecord>> {
        Ok(match self.clicks.get(session_id).await {
            Some(list) => list.lock().iter().cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn snapshot_counters(&self, window: Duration, now: DateTime<Utc>) -> Result<CacheCounters> {
        let window = chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::days(1));
        let since = now - window;
        let today = now.date_naive();

        let active = self
            .active
            .iter()
            .filter(|(_, last_seen)| *last_seen >= since)
            .count() as u64;
        let seen_today = self.seen.iter().filter(|(_, day)| *day == today).count() as u64;

        metrics().cached_active_sessions.set(active);

        Ok(CacheCounters {
            active,
            today: seen_today,
        })
    }
}
