//! Dashboard endpoints.

use analytics::{AnalyticsOverview, RealtimeStats};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use session_cache::ClickRecord;
use tracking_core::{schema::validate_session_id, TimeRange};

use crate::response::ApiError;
use crate::state::AppState;

const DEFAULT_RANGE: &str = "7d";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewQuery {
    pub range: Option<String>,
    pub ga4_active_users: Option<u64>,
}

/// GET /api/analytics/overview?range=7d&ga4ActiveUsers=N
pub async fn overview_handler(
    State(state): State<AppState>,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<AnalyticsOverview>, ApiError> {
    let now = Utc::now();
    let range = TimeRange::parse(query.range.as_deref().unwrap_or(DEFAULT_RANGE), now)?;
    let overview = state
        .analytics
        .overview(range, query.ga4_active_users, now)
        .await?;
    Ok(Json(overview))
}

/// GET /api/analytics/realtime
pub async fn realtime_handler(State(state): State<AppState>) -> Json<RealtimeStats> {
    Json(state.analytics.realtime(Utc::now()).await)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickTimeline {
    pub session_id: String,
    pub clicks: Vec<ClickRecord>,
}

/// GET /api/analytics/sessions/:session_id/clicks
pub async fn session_clicks_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ClickTimeline>, ApiError> {
    validate_session_id(&session_id)?;
    let clicks = state.analytics.session_clicks(&session_id).await;
    Ok(Json(ClickTimeline { session_id, clicks }))
}
