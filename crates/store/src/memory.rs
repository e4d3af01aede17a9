//! In-memory event store for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracking_core::schema::{
    validate_interaction, validate_metric, validate_selection, validate_session_id,
    validate_snapshot,
};
use tracking_core::{
    ConfigurationSnapshot, Error, InteractionEvent, PerformanceMetric, Result, SelectionEvent,
    Session, SessionMetadata, SessionStatus, SessionUpdate, TimeRange,
};

use crate::store::{EventStore, SessionChange, SessionRollup};

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    interactions: Vec<InteractionEvent>,
    selections: Vec<SelectionEvent>,
    snapshots: Vec<ConfigurationSnapshot>,
    metrics: Vec<PerformanceMetric>,
}

impl Inner {
    fn rollup(&self, session: &Session) -> SessionRollup {
        let mut rollup = SessionRollup::bare(session.clone());
        let id = session.session_id.as_str();

        for event in self.interactions.iter().filter(|e| e.session_id == id) {
            rollup.interaction_count += 1;
            if event.is_page_visit() {
                rollup.page_visits += 1;
            }
            if event.is_form_submit() {
                rollup.form_submissions += 1;
            }
        }
        rollup.selection_count = self.selections.iter().filter(|s| s.session_id == id).count() as u64;
        for snapshot in self.snapshots.iter().filter(|s| s.session_id == id) {
            rollup.snapshot_count += 1;
            rollup.max_completion = rollup.max_completion.max(snapshot.completion_percentage);
        }

        rollup
    }
}

/// Process-local store. Every guarded update runs under one write lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.inner.read().sessions.len()
    }

    pub fn interaction_count(&self) -> usize {
        self.inner.read().interactions.len()
    }

    /// All performance metric rows, in insertion order.
    pub fn performance_metrics(&self) -> Vec<PerformanceMetric> {
        self.inner.read().metrics.clone()
    }

    /// Inserts or replaces a session as-is. Test seeding only.
    pub fn put_session(&self, session: Session) {
        self.inner
            .write()
            .sessions
            .insert(session.session_id.clone(), session);
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create_or_get_session(
        &self,
        session_id: &str,
        metadata: &SessionMetadata,
        at: DateTime<Utc>,
    ) -> Result<(Session, bool)> {
        validate_session_id(session_id)?;

        let mut inner = self.inner.write();
        if let Some(existing) = inner.sessions.get(session_id) {
            return Ok((existing.clone(), false));
        }

        let session = Session::new(session_id, metadata.clone(), at);
        inner
            .sessions
            .insert(session_id.to_string(), session.clone());
        Ok((session, true))
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.inner.read().sessions.get(session_id).cloned())
    }

    async fn append_interactions(&self, events: &[InteractionEvent]) -> Result<usize> {
        for event in events {
            validate_interaction(event)?;
        }
        self.inner.write().interactions.extend_from_slice(events);
        Ok(events.len())
    }

    async fn append_selection(&self, event: &SelectionEvent) -> Result<()> {
        validate_selection(event)?;
        self.inner.write().selections.push(event.clone());
        Ok(())
    }

    async fn append_snapshot(&self, snapshot: &ConfigurationSnapshot) -> Result<()> {
        validate_snapshot(snapshot)?;
        self.inner.write().snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn append_metrics(&self, metrics: &[PerformanceMetric]) -> Result<usize> {
        for metric in metrics {
            validate_metric(metric)?;
        }
        self.inner.write().metrics.extend_from_slice(metrics);
        Ok(metrics.len())
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<SessionChange> {
        let mut inner = self.inner.write();
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::session_not_found(session_id))?;

        let outcome = session.apply(update);
        Ok(SessionChange {
            session: session.clone(),
            outcome,
        })
    }

    async fn list_interactions(&self, session_id: &str) -> Result<Vec<InteractionEvent>> {
        let mut events: Vec<InteractionEvent> = self
            .inner
            .read()
            .interactions
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    async fn list_snapshots(&self, session_id: &str) -> Result<Vec<ConfigurationSnapshot>> {
        let mut snapshots: Vec<ConfigurationSnapshot> = self
            .inner
            .read()
            .snapshots
            .iter()
            .filter(|s| s.session_id == session_id)
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.timestamp);
        Ok(snapshots)
    }

    async fn session_rollups(&self, range: &TimeRange) -> Result<Vec<SessionRollup>> {
        let inner = self.inner.read();
        let mut rollups: Vec<SessionRollup> = inner
            .sessions
            .values()
            .filter(|s| range.contains(s.start_time))
            .map(|s| inner.rollup(s))
            .collect();
        rollups.sort_by_key(|r| r.session.start_time);
        Ok(rollups)
    }

    async fn stale_active_sessions(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SessionRollup>> {
        let inner = self.inner.read();
        let mut stale: Vec<&Session> = inner
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Active && s.last_activity < cutoff)
            .collect();
        stale.sort_by_key(|s| s.last_activity);

        Ok(stale
            .into_iter()
            .take(limit)
            .map(|s| inner.rollup(s))
            .collect())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
