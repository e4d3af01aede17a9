//! Tracking endpoints.
//!
//! Interactions accept 3 body formats:
//! 1. Single interaction: `{ "sessionId": "...", "eventType": "...", ... }`
//! 2. Array: `[interaction, interaction, ...]`
//! 3. Object with events: `{ "events": [...] }`
//!
//! Malformed bodies answer 400 and must not be retried. Store failures answer
//! 503 and are retried by the collector.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::Utc;
use event_store::FinalizeOutcome;
use serde::Serialize;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, info, warn};
use tracking_core::{
    ConversionRequest, FinalizeRequest, InteractionBatch, MetricSubmission, SelectionSubmission,
    SnapshotSubmission,
};

use crate::extractors::ClientMeta;
use crate::pipeline::{self, parse_body};
use crate::response::{ApiError, TrackResponse};
use crate::state::AppState;

/// POST /api/track/interactions
pub async fn interactions_handler(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    body: Bytes,
) -> Result<Json<TrackResponse>, ApiError> {
    let start = Instant::now();
    metrics().requests_received.inc();

    let batch = InteractionBatch::parse(&body).map_err(|e| {
        warn!(error = %e, "Failed to parse interaction payload");
        ApiError::from(e)
    })?;

    let summary = pipeline::ingest_interactions(&state, batch, &client, Utc::now()).await?;

    let latency_ms = start.elapsed().as_millis() as u64;
    metrics().ingest_latency_ms.observe(latency_ms);

    debug!(
        accepted = summary.accepted,
        sessions = summary.sessions,
        latency_ms = latency_ms,
        "Interaction batch stored"
    );

    Ok(Json(
        TrackResponse::success(summary.accepted).with_sessions_created(summary.sessions_created),
    ))
}

/// POST /api/track/selections
pub async fn selection_handler(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    body: Bytes,
) -> Result<Json<TrackResponse>, ApiError> {
    metrics().requests_received.inc();
    let submission: SelectionSubmission = parse_body(&body, "selection")?;
    pipeline::record_selection(&state, submission, &client, Utc::now()).await?;
    Ok(Json(TrackResponse::success(1)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub success: bool,
    pub completion_percentage: u8,
}

/// POST /api/track/snapshots
pub async fn snapshot_handler(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    body: Bytes,
) -> Result<Json<SnapshotResponse>, ApiError> {
    metrics().requests_received.inc();
    let submission: SnapshotSubmission = parse_body(&body, "snapshot")?;
    let completion_percentage =
        pipeline::record_snapshot(&state, submission, &client, Utc::now()).await?;
    Ok(Json(SnapshotResponse {
        success: true,
        completion_percentage,
    }))
}

/// POST /api/track/metrics
pub async fn metric_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    metrics().requests_received.inc();
    let submission: MetricSubmission = parse_body(&body, "metric")?;
    pipeline::record_metric(&state, submission, Utc::now()).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/track/finalize
///
/// Beacon target. The body is JSON whatever the content type says.
pub async fn finalize_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<FinalizeOutcome>, ApiError> {
    metrics().requests_received.inc();
    let request = FinalizeRequest::parse(&body)?;
    let outcome = state.finalizer.finalize(request, Utc::now()).await?;
    Ok(Json(outcome))
}

/// POST /api/track/conversion
pub async fn conversion_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<FinalizeOutcome>, ApiError> {
    metrics().requests_received.inc();
    let request: ConversionRequest = parse_body(&body, "conversion")?;
    let session_id = request.session_id.clone();
    let outcome = state.finalizer.convert(request, Utc::now()).await?;

    info!(
        session_id = %session_id,
        found = outcome.session_found,
        written = outcome.written,
        "Conversion signal"
    );
    Ok(Json(outcome))
}
