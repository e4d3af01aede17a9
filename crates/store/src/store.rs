//! The `EventStore` contract shared by all backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracking_core::{
    ConfigurationSnapshot, InteractionEvent, PerformanceMetric, Result, SelectionEvent, Session,
    SessionMetadata, SessionStatus, SessionUpdate, TimeRange, UpdateOutcome,
};

/// A session after a guarded update, plus what the update changed.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionChange {
    pub session: Session,
    pub outcome: UpdateOutcome,
}

/// Per-session aggregates over the event logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRollup {
    pub session: Session,
    pub interaction_count: u64,
    pub page_visits: u64,
    pub form_submissions: u64,
    pub selection_count: u64,
    pub snapshot_count: u64,
    /// Highest completion percentage seen in any snapshot.
    pub max_completion: u8,
}

impl SessionRollup {
    /// A rollup with no logged activity.
    pub fn bare(session: Session) -> Self {
        Self {
            session,
            interaction_count: 0,
            page_visits: 0,
            form_submissions: 0,
            selection_count: 0,
            snapshot_count: 0,
            max_completion: 0,
        }
    }

    /// Whether the visitor reached a conversion or feedback milestone.
    pub fn reached_milestone(&self) -> bool {
        self.form_submissions > 0
    }

    /// Whether the visitor did anything beyond loading a page.
    pub fn is_engaged(&self) -> bool {
        self.interaction_count > self.page_visits
            || self.selection_count > 0
            || self.snapshot_count > 0
    }
}

/// Durable, append-only event storage.
///
/// Appends validate their payload before touching storage. Session updates
/// are guarded and serialized per session id.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Returns the existing session or creates it. The flag is true on create.
    async fn create_or_get_session(
        &self,
        session_id: &str,
        metadata: &SessionMetadata,
        at: DateTime<Utc>,
    ) -> Result<(Session, bool)>;

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>>;

    /// Appends a batch of interactions. Nothing is written if any row is invalid.
    async fn append_interactions(&self, events: &[InteractionEvent]) -> Result<usize>;

    async fn append_interaction(&self, event: &InteractionEvent) -> Result<()> {
        self.append_interactions(std::slice::from_ref(event)).await?;
        Ok(())
    }

    async fn append_selection(&self, event: &SelectionEvent) -> Result<()>;

    async fn append_snapshot(&self, snapshot: &ConfigurationSnapshot) -> Result<()>;

    async fn append_metrics(&self, metrics: &[PerformanceMetric]) -> Result<usize>;

    async fn append_metric(&self, metric: &PerformanceMetric) -> Result<()> {
        self.append_metrics(std::slice::from_ref(metric)).await?;
        Ok(())
    }

    /// Applies a guarded update. Fails with `SessionNotFound` for unknown ids.
    async fn update_session(&self, session_id: &str, update: &SessionUpdate)
        -> Result<SessionChange>;

    /// Status and end-time only form of `update_session`.
    async fn update_session_status(
        &self,
        session_id: &str,
        status: Option<SessionStatus>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<SessionChange> {
        let update = SessionUpdate {
            status,
            end_time,
            ..Default::default()
        };
        self.update_session(session_id, &update).await
    }

    /// Interactions of one session, oldest first.
    async fn list_interactions(&self, session_id: &str) -> Result<Vec<InteractionEvent>>;

    /// Snapshots of one session, oldest first.
    async fn list_snapshots(&self, session_id: &str) -> Result<Vec<ConfigurationSnapshot>>;

    /// Rollups for sessions that started inside `range`.
    async fn session_rollups(&self, range: &TimeRange) -> Result<Vec<SessionRollup>>;

    /// ACTIVE sessions whose last activity is before `cutoff`, oldest first.
    async fn stale_active_sessions(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SessionRollup>>;

    async fn health_check(&self) -> Result<()>;
}
