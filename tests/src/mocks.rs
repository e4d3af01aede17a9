//! Mock implementations for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_store::{EventStore, MemoryStore, SessionChange, SessionRollup};
use session_cache::{CacheCounters, ClickRecord, SessionCache};
use tracking_core::{
    ConfigurationSnapshot, Error, InteractionEvent, PerformanceMetric, Result, SelectionEvent,
    Session, SessionMetadata, SessionUpdate, StoreErrorCode, TimeRange,
};

/// Memory store that can be switched into an outage.
///
/// While failing, every call returns a transient store error, the same way
/// an unreachable ClickHouse does.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Set failure mode for testing error handling.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::store(StoreErrorCode::Unavailable, "mock store outage"));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for FlakyStore {
    async fn create_or_get_session(
        &self,
        session_id: &str,
        metadata: &SessionMetadata,
        at: DateTime<Utc>,
    ) -> Result<(Session, bool)> {
        self.check()?;
        self.inner.create_or_get_session(session_id, metadata, at).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        self.check()?;
        self.inner.get_session(session_id).await
    }

    async fn append_interactions(&self, events: &[InteractionEvent]) -> Result<usize> {
        self.check()?;
        self.inner.append_interactions(events).await
    }

    async fn append_selection(&self, event: &SelectionEvent) -> Result<()> {
        self.check()?;
        self.inner.append_selection(event).await
    }

    async fn append_snapshot(&self, snapshot: &ConfigurationSnapshot) -> Result<()> {
        self.check()?;
        self.inner.append_snapshot(snapshot).await
    }

    async fn append_metrics(&self, metrics: &[PerformanceMetric]) -> Result<usize> {
        self.check()?;
        self.inner.append_metrics(metrics).await
    }

    async fn update_session(&self, session_id: &str, update: &SessionUpdate) -> Result<SessionChange> {
        self.check()?;
        self.inner.update_session(session_id, update).await
    }

    async fn list_interactions(&self, session_id: &str) -> Result<Vec<InteractionEvent>> {
        self.check()?;
        self.inner.list_interactions(session_id).await
    }

    async fn list_snapshots(&self, session_id: &str) -> Result<Vec<ConfigurationSnapshot>> {
        self.check()?;
        self.inner.list_snapshots(session_id).await
    }

    async fn session_rollups(&self, range: &TimeRange) -> Result<Vec<SessionRollup>> {
        self.check()?;
        self.inner.session_rollups(range).await
    }

    async fn stale_active_sessions(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SessionRollup>> {
        self.check()?;
        self.inner.stale_active_sessions(cutoff, limit).await
    }

    async fn health_check(&self) -> Result<()> {
        self.check()
    }
}

/// A cache that is always down.
#[derive(Clone, Default)]
pub struct DownCache {
    attempts: Arc<AtomicUsize>,
}

impl DownCache {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::cache_unavailable("connection refused"))
    }
}

#[async_trait]
impl SessionCache for DownCache {
    async fn mark_active(&self, _session_id: &str, _at: DateTime<Utc>) -> Result<()> {
        self.fail()
    }

    async fn record_click(&self, _session_id: &str, _click: ClickRecord) -> Result<()> {
        self.fail()
    }

    async fn recent_clicks(&self, _session_id: &str) -> Result<Vec<ClickRecord>> {
        self.fail()
    }

    async fn snapshot_counters(&self, _window: Duration, _now: DateTime<Utc>) -> Result<CacheCounters> {
        self.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flaky_store_outage() {
        let store = FlakyStore::new();
        store
            .create_or_get_session("s", &SessionMetadata::default(), Utc::now())
            .await
            .unwrap();

        store.set_failing(true);
        let err = store.get_session("s").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.http_status(), 503);

        store.set_failing(false);
        assert!(store.get_session("s").await.unwrap().is_some());
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn test_down_cache_counts_attempts() {
        let cache = DownCache::default();
        assert!(cache.mark_active("s", Utc::now()).await.is_err());
        assert!(cache.recent_clicks("s").await.is_err());
        assert_eq!(cache.attempts(), 2);
    }
}
