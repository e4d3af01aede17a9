//! Ingestion pipeline.
//!
//! Every accepted row goes to the durable store first. The cache is updated
//! afterwards on a best-effort basis, so a cache outage never fails a request
//! and a store outage always does.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use session_cache::{mark_active_or_warn, mirror_interactions};
use telemetry::metrics;
use tracing::{debug, info, warn};
use tracking_core::{
    schema, ClientMetadata, Error, InteractionBatch, InteractionEvent, MetricSubmission,
    SelectionSubmission, SessionMetadata, SessionUpdate, SnapshotSubmission,
};

use crate::response::ApiError;
use crate::state::AppState;

/// Result of an accepted interaction batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub accepted: usize,
    pub sessions: usize,
    pub sessions_created: usize,
}

/// Parse a JSON body after checking its size.
pub fn parse_body<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, ApiError> {
    schema::validate_batch_size(bytes)?;
    serde_json::from_slice(bytes)
        .map_err(|e| ApiError::bad_request(format!("invalid {}: {}", what, e)))
}

fn client_session_metadata(client: &ClientMetadata) -> SessionMetadata {
    SessionMetadata {
        ip_address: client.ip_address.clone(),
        user_agent: client.user_agent.clone(),
        country: client.country.clone(),
        ..Default::default()
    }
}

/// Make sure the session row exists. Returns true when it was created.
async fn ensure_session(
    state: &AppState,
    session_id: &str,
    metadata: &SessionMetadata,
    at: DateTime<Utc>,
) -> Result<bool, Error> {
    let (_, created) = state
        .store
        .create_or_get_session(session_id, metadata, at)
        .await?;
    if created {
        metrics().sessions_created.inc();
        debug!(session_id = %session_id, "Session created");
    }
    Ok(created)
}

struct SessionBatch {
    metadata: SessionMetadata,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    count: u64,
}

/// Validate, persist and mirror a batch of interactions.
///
/// The batch is all-or-nothing: one invalid interaction rejects the request
/// before anything is written.
pub async fn ingest_interactions(
    state: &AppState,
    batch: InteractionBatch,
    client: &ClientMetadata,
    now: DateTime<Utc>,
) -> Result<IngestSummary, ApiError> {
    let total = batch.events.len();
    metrics().interactions_received.inc_by(total as u64);

    let mut events: Vec<InteractionEvent> = Vec::with_capacity(total);
    let mut errors = Vec::new();
    let mut first_code = None;
    let mut order: Vec<String> = Vec::new();
    let mut sessions: HashMap<String, SessionBatch> = HashMap::new();

    for (i, submission) in batch.events.into_iter().enumerate() {
        let metadata = submission.session_metadata(client);
        match submission.into_event(now) {
            Ok(event) => {
                let entry = sessions.entry(event.session_id.clone()).or_insert_with(|| {
                    order.push(event.session_id.clone());
                    SessionBatch {
                        metadata,
                        first: event.timestamp,
                        last: event.timestamp,
                        count: 0,
                    }
                });
                entry.first = entry.first.min(event.timestamp);
                entry.last = entry.last.max(event.timestamp);
                entry.count += 1;
                events.push(event);
            }
            Err(e) => {
                first_code.get_or_insert(e.error_code().unwrap_or("VALID_001"));
                errors.push(format!("interaction {}: {}", i, e));
            }
        }
    }

    if !errors.is_empty() {
        metrics().interactions_rejected.inc_by(total as u64);
        warn!(rejected = errors.len(), total = total, "Interaction batch failed validation");
        return Err(ApiError::validation(first_code.unwrap_or("VALID_001"), errors));
    }

    let mut sessions_created = 0;
    for session_id in &order {
        let entry = &sessions[session_id];
        if ensure_session(state, session_id, &entry.metadata, entry.first).await? {
            sessions_created += 1;
        }
    }

    state.store.append_interactions(&events).await?;

    for session_id in &order {
        let entry = &sessions[session_id];
        let update = SessionUpdate::activity(entry.last).with_events(entry.count);
        state.store.update_session(session_id, &update).await?;
    }

    mirror_interactions(state.cache.as_ref(), &events).await;

    metrics().interactions_accepted.inc_by(total as u64);
    Ok(IngestSummary {
        accepted: total,
        sessions: order.len(),
        sessions_created,
    })
}

/// Persist one configuration change and advance the session's activity.
pub async fn record_selection(
    state: &AppState,
    submission: SelectionSubmission,
    client: &ClientMetadata,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    let event = submission.into_event(now)?;
    ensure_session(state, &event.session_id, &client_session_metadata(client), event.timestamp)
        .await?;
    state.store.append_selection(&event).await?;

    let update = SessionUpdate {
        last_activity: Some(event.timestamp),
        ..Default::default()
    };
    state.store.update_session(&event.session_id, &update).await?;
    mark_active_or_warn(state.cache.as_ref(), &event.session_id, event.timestamp).await;

    metrics().selections_recorded.inc();
    debug!(
        session_id = %event.session_id,
        category = %event.category,
        price_change = event.price_change,
        "Selection recorded"
    );
    Ok(())
}

/// Persist a snapshot and make it the session's latest configuration.
///
/// The completion percentage is always recomputed here.
pub async fn record_snapshot(
    state: &AppState,
    submission: SnapshotSubmission,
    client: &ClientMetadata,
    now: DateTime<Utc>,
) -> Result<u8, ApiError> {
    let snapshot = submission.into_snapshot(&state.completion, now)?;
    ensure_session(
        state,
        &snapshot.session_id,
        &client_session_metadata(client),
        snapshot.timestamp,
    )
    .await?;
    state.store.append_snapshot(&snapshot).await?;

    let update = SessionUpdate::default()
        .with_activity(snapshot.timestamp)
        .with_configuration(snapshot.configuration_data.clone(), Some(snapshot.total_price));
    state.store.update_session(&snapshot.session_id, &update).await?;
    mark_active_or_warn(state.cache.as_ref(), &snapshot.session_id, snapshot.timestamp).await;

    metrics().snapshots_recorded.inc();
    info!(
        session_id = %snapshot.session_id,
        trigger = snapshot.trigger_event.as_str(),
        completion = snapshot.completion_percentage,
        "Snapshot recorded"
    );
    Ok(snapshot.completion_percentage)
}

/// Persist one client instrumentation sample. Sessions are not touched.
pub async fn record_metric(
    state: &AppState,
    submission: MetricSubmission,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    let metric = submission.into_metric(now)?;
    state.store.append_metric(&metric).await?;
    metrics().metrics_recorded.inc();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::AnalyticsConfig;
    use event_store::{EventStore, MemoryStore};
    use serde_json::json;
    use session_cache::{MokaSessionCache, SessionCache};
    use std::sync::Arc;

    fn state() -> (AppState, Arc<MemoryStore>, Arc<MokaSessionCache>) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MokaSessionCache::default());
        let state = AppState::new(store.clone(), cache.clone(), AnalyticsConfig::default());
        (state, store, cache)
    }

    fn batch(value: serde_json::Value) -> InteractionBatch {
        InteractionBatch::parse(value.to_string().as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_batch_creates_sessions_and_counts_events() {
        let (state, store, cache) = state();
        let now = Utc::now();
        let ts = now.timestamp_millis();
        let client = ClientMetadata {
            user_agent: Some("Mozilla/5.0".into()),
            ..Default::default()
        };

        let summary = ingest_interactions(
            &state,
            batch(json!([
                {"sessionId": "a", "eventType": "page_visit", "category": "navigation",
                 "timestamp": ts - 2000, "url": "https://shop.example/?utm_source=Mail",
                 "additionalData": {"path": "/"}},
                {"sessionId": "a", "eventType": "click", "category": "cta",
                 "elementId": "start", "timestamp": ts - 1000,
                 "additionalData": {"tag": "button", "clickCount": 2}},
                {"sessionId": "b", "eventType": "page_visit", "category": "navigation",
                 "additionalData": {"path": "/"}}
            ])),
            &client,
            now,
        )
        .await
        .unwrap();

        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.sessions_created, 2);
        assert_eq!(store.interaction_count(), 3);

        let a = store.get_session("a").await.unwrap().unwrap();
        assert_eq!(a.event_count, 2);
        assert_eq!(a.last_activity.timestamp_millis(), ts - 1000);
        assert_eq!(a.utm_source.as_deref(), Some("Mail"));
        assert_eq!(a.user_agent.as_deref(), Some("Mozilla/5.0"));

        let clicks = cache.recent_clicks("a").await.unwrap();
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].click_count, 2);
    }

    #[tokio::test]
    async fn test_invalid_interaction_rejects_whole_batch() {
        let (state, store, _) = state();
        let now = Utc::now();
        let err = ingest_interactions(
            &state,
            batch(json!({"events": [
                {"sessionId": "a", "eventType": "page_visit", "category": "navigation",
                 "additionalData": {"path": "/"}},
                {"sessionId": "a", "eventType": "click", "category": "cta",
                 "timestamp": now.timestamp_millis() + 3_600_000}
            ]})),
            &ClientMetadata::default(),
            now,
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), "VALID_004");
        assert_eq!(err.response.details.as_ref().map(Vec::len), Some(1));
        assert_eq!(store.session_count(), 0);
        assert_eq!(store.interaction_count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_recomputes_completion_and_sets_configuration() {
        let (state, store, _) = state();
        let now = Utc::now();
        let submission: SnapshotSubmission = serde_json::from_value(json!({
            "sessionId": "s",
            "configurationData": {"model": "touring", "color": "red", "completionPercentage": 100},
            "totalPrice": 4_250_000,
            "triggerEvent": "manual_save"
        }))
        .unwrap();

        record_snapshot(&state, submission, &ClientMetadata::default(), now)
            .await
            .unwrap();

        let session = store.get_session("s").await.unwrap().unwrap();
        assert_eq!(session.total_price, Some(4_250_000));
        assert_eq!(session.configuration_data["model"], "touring");

        let snapshots = store.list_snapshots("s").await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(
            snapshots[0].completion_percentage,
            state.completion.completion_percentage(&snapshots[0].configuration_data)
        );
    }
}
