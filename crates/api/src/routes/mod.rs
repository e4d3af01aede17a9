//! API routes.

pub mod analytics;
pub mod health;
pub mod track;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/track/interactions", post(track::interactions_handler))
        .route("/api/track/selections", post(track::selection_handler))
        .route("/api/track/snapshots", post(track::snapshot_handler))
        .route("/api/track/metrics", post(track::metric_handler))
        .route("/api/track/finalize", post(track::finalize_handler))
        .route("/api/track/conversion", post(track::conversion_handler))
        .route("/api/analytics/overview", get(analytics::overview_handler))
        .route("/api/analytics/realtime", get(analytics::realtime_handler))
        .route(
            "/api/analytics/sessions/:session_id/clicks",
            get(analytics::session_clicks_handler),
        )
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
