//! `EventStore` on ClickHouse.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ::clickhouse::Row;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use telemetry::metrics;
use tokio::sync::Mutex;
use tracing::debug;
use tracking_core::schema::{
    validate_interaction, validate_metric, validate_selection, validate_session_id,
    validate_snapshot,
};
use tracking_core::{
    ConfigurationSnapshot, Error, InteractionEvent, PerformanceMetric, Result, SelectionEvent,
    Session, SessionMetadata, SessionUpdate, StoreErrorCode, TimeRange,
};

use super::client::ClickHouseClient;
use super::rows::{InteractionRow, MetricRow, RollupRow, SelectionRow, SessionRow, SnapshotRow};
use super::schema::{
    INTERACTIONS_TABLE, METRICS_TABLE, SELECTIONS_TABLE, SESSIONS_TABLE, SNAPSHOTS_TABLE,
};
use crate::store::{EventStore, SessionChange, SessionRollup};

/// DateTime64(3) columns arrive as Int64 milliseconds in RowBinary.
const SESSION_COLUMNS: &str = "id, session_id, ip_address, user_agent, referrer, utm_source, \
     country, start_time, end_time, last_activity, status, total_price, configuration_data, \
     event_count, version";

/// Map a driver error to a coded store error.
fn store_error(code: StoreErrorCode, e: ::clickhouse::error::Error) -> Error {
    let code = match &e {
        ::clickhouse::error::Error::Network(_) => StoreErrorCode::Unavailable,
        _ => code,
    };
    Error::store(code, format!("ClickHouse: {}", e))
}

fn write_error(e: ::clickhouse::error::Error) -> Error {
    metrics().store_write_errors.inc();
    store_error(StoreErrorCode::WriteFailed, e)
}

fn query_error(e: ::clickhouse::error::Error) -> Error {
    metrics().store_query_errors.inc();
    store_error(StoreErrorCode::QueryFailed, e)
}

/// Rollup query over sessions matching `filter`, joined with log aggregates.
fn rollup_query(filter: &str, suffix: &str) -> String {
    format!(
        r#"
SELECT
    s.id, s.session_id, s.ip_address, s.user_agent, s.referrer, s.utm_source, s.country,
    s.start_time, s.end_time, s.last_activity, s.status, s.total_price,
    s.configuration_data, s.event_count, s.version,
    i.interaction_count, i.page_visits, i.form_submissions,
    sel.selection_count,
    snap.snapshot_count, snap.max_completion
FROM (
    SELECT {columns} FROM {sessions} FINAL WHERE {filter} {suffix}
) AS s
LEFT JOIN (
    SELECT session_id,
        count() AS interaction_count,
        countIf(event_type = 'page_visit') AS page_visits,
        countIf(event_type = 'form_submit') AS form_submissions
    FROM {interactions} GROUP BY session_id
) AS i ON s.session_id = i.session_id
LEFT JOIN (
    SELECT session_id, count() AS selection_count FROM {selections} GROUP BY session_id
) AS sel ON s.session_id = sel.session_id
LEFT JOIN (
    SELECT session_id, count() AS snapshot_count, max(completion_percentage) AS max_completion
    FROM {snapshots} GROUP BY session_id
) AS snap ON s.session_id = snap.session_id
ORDER BY s.last_activity
"#,
        columns = SESSION_COLUMNS,
        sessions = SESSIONS_TABLE,
        interactions = INTERACTIONS_TABLE,
        selections = SELECTIONS_TABLE,
        snapshots = SNAPSHOTS_TABLE,
        filter = filter,
        suffix = suffix,
    )
}

/// ClickHouse-backed event store.
///
/// Session updates are read-modify-write on a versioned row, serialized per
/// session id within this process.
///
/// The lock is process-local, so the store assumes a single writer per
/// session: one API process owns all writes, or replicas route requests by
/// session id. Two processes updating the same session can each write the
/// same version, and the merge then keeps either row.
pub struct ClickHouseStore {
    client: ClickHouseClient,
    locks: Cache<String, Arc<Mutex<()>>>,
}

impl ClickHouseStore {
    pub fn new(client: ClickHouseClient) -> Self {
        let idle = Duration::from_secs(client.config().lock_idle_secs);
        Self {
            client,
            locks: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(idle)
                .build(),
        }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }

    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .get_with(session_id.to_string(), async { Arc::new(Mutex::new(())) })
            .await
    }

    async fn insert_rows<T>(&self, table: &str, rows: &[T]) -> Result<usize>
    where
        T: Row + Serialize + Send + Sync,
    {
        if rows.is_empty() {
            return Ok(0);
        }

        let start = Instant::now();
        let mut insert = self.client.inner().insert(table).map_err(write_error)?;
        for row in rows {
            insert.write(row).await.map_err(write_error)?;
        }
        insert.end().await.map_err(write_error)?;

        let elapsed = start.elapsed();
        metrics().store_latency_ms.observe(elapsed.as_millis() as u64);
        metrics().store_writes.inc();

        debug!(
            table = table,
            count = rows.len(),
            latency_ms = %elapsed.as_millis(),
            "Inserted rows"
        );

        Ok(rows.len())
    }

    async fn fetch_session_row(&self, session_id: &str) -> Result<Option<SessionRow>> {
        let sql = format!(
            "SELECT {} FROM {} FINAL WHERE session_id = ? LIMIT 1",
            SESSION_COLUMNS, SESSIONS_TABLE
        );
        self.client
            .inner()
            .query(&sql)
            .bind(session_id)
            .fetch_optional::<SessionRow>()
            .await
            .map_err(query_error)
    }
}

#[async_trait]
impl EventStore for ClickHouseStore {
    async fn create_or_get_session(
        &self,
        session_id: &str,
        metadata: &SessionMetadata,
        at: DateTime<Utc>,
    ) -> Result<(Session, bool)> {
        validate_session_id(session_id)?;

        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        if let Some(row) = self.fetch_session_row(session_id).await? {
            return Ok((row.into_session(), false));
        }

        let session = Session::new(session_id, metadata.clone(), at);
        self.insert_rows(SESSIONS_TABLE, &[SessionRow::from_session(&session, 1)])
            .await?;
        Ok((session, true))
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self
            .fetch_session_row(session_id)
            .await?
            .map(SessionRow::into_session))
    }

    async fn append_interactions(&self, events: &[InteractionEvent]) -> Result<usize> {
        for event in events {
            validate_interaction(event)?;
        }
        let rows: Vec<InteractionRow> = events.iter().map(InteractionRow::from).collect();
        self.insert_rows(INTERACTIONS_TABLE, &rows).await
    }

    async fn append_selection(&self, event: &SelectionEvent) -> Result<()> {
        validate_selection(event)?;
        self.insert_rows(SELECTIONS_TABLE, &[SelectionRow::from(event)])
            .await?;
        Ok(())
    }

    async fn append_snapshot(&self, snapshot: &ConfigurationSnapshot) -> Result<()> {
        validate_snapshot(snapshot)?;
        self.insert_rows(SNAPSHOTS_TABLE, &[SnapshotRow::from(snapshot)])
            .await?;
        Ok(())
    }

    async fn append_metrics(&self, metrics: &[PerformanceMetric]) -> Result<usize> {
        for metric in metrics {
            validate_metric(metric)?;
        }
        let rows: Vec<MetricRow> = metrics.iter().map(MetricRow::from).collect();
        self.insert_rows(METRICS_TABLE, &rows).await
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<SessionChange> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let row = self
            .fetch_session_row(session_id)
            .await?
            .ok_or_else(|| Error::session_not_found(session_id))?;
        let version = row.version;
        let mut session = row.into_session();

        let outcome = session.apply(update);
        if outcome.changed() || update.counts_events() {
            self.insert_rows(
                SESSIONS_TABLE,
                &[SessionRow::from_session(&session, version + 1)],
            )
            .await?;
        }

        Ok(SessionChange { session, outcome })
    }

    async fn list_interactions(&self, session_id: &str) -> Result<Vec<InteractionEvent>> {
        let sql = format!(
            "SELECT id, session_id, event_type, category, element_id, selection_value, \
             previous_value, time_spent, device_type, viewport_width, viewport_height, \
             timestamp, received_at, additional_data \
             FROM {} WHERE session_id = ? ORDER BY timestamp",
            INTERACTIONS_TABLE
        );
        let rows: Vec<InteractionRow> = self
            .client
            .inner()
            .query(&sql)
            .bind(session_id)
            .fetch_all()
            .await
            .map_err(query_error)?;
        Ok(rows.into_iter().map(InteractionRow::into_event).collect())
    }

    async fn list_snapshots(&self, session_id: &str) -> Result<Vec<ConfigurationSnapshot>> {
        let sql = format!(
            "SELECT id, session_id, configuration_data, total_price, completion_percentage, \
             trigger_event, timestamp \
             FROM {} WHERE session_id = ? ORDER BY timestamp",
            SNAPSHOTS_TABLE
        );
        let rows: Vec<SnapshotRow> = self
            .client
            .inner()
            .query(&sql)
            .bind(session_id)
            .fetch_all()
            .await
            .map_err(query_error)?;
        Ok(rows.into_iter().map(SnapshotRow::into_snapshot).collect())
    }

    async fn session_rollups(&self, range: &TimeRange) -> Result<Vec<SessionRollup>> {
        let sql = rollup_query(
            "toUnixTimestamp64Milli(start_time) >= ? AND toUnixTimestamp64Milli(start_time) < ?",
            "",
        );
        let rows: Vec<RollupRow> = self
            .client
            .inner()
            .query(&sql)
            .bind(range.start.timestamp_millis())
            .bind(range.end.timestamp_millis())
            .fetch_all()
            .await
            .map_err(query_error)?;
        Ok(rows.into_iter().map(RollupRow::into_rollup).collect())
    }

    async fn stale_active_sessions(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SessionRollup>> {
        let sql = rollup_query(
            "status = 'ACTIVE' AND toUnixTimestamp64Milli(last_activity) < ?",
            "ORDER BY last_activity LIMIT ?",
        );
        let rows: Vec<RollupRow> = self
            .client
            .inner()
            .query(&sql)
            .bind(cutoff.timestamp_millis())
            .bind(limit as u64)
            .fetch_all()
            .await
            .map_err(query_error)?;
        Ok(rows.into_iter().map(RollupRow::into_rollup).collect())
    }

    async fn health_check(&self) -> Result<()> {
        if self.client.check_connection().await {
            Ok(())
        } else {
            Err(Error::store(
                StoreErrorCode::Unavailable,
                "ClickHouse health check failed",
            ))
        }
    }
}
