//! Tests for health check endpoints.
//!
//! The registry is process-global, so every state transition runs in one
//! test.

use std::sync::Arc;

use axum::http::StatusCode;
use event_store::MemoryStore;
use integration_tests::{fixtures, mocks::DownCache, setup::TestContext};
use serde_json::Value;
use telemetry::health;

#[tokio::test]
async fn test_health_transitions() {
    let cache = DownCache::default();
    let ctx = TestContext::with_backends(Arc::new(MemoryStore::new()), Arc::new(cache));
    let server = ctx.server();

    health().cache.set_healthy();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["report"]["components"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store_connected"], true);
    assert_eq!(body["cache_connected"], true);

    // A failed cache write degrades the service but keeps it ready.
    server
        .post("/api/track/interactions")
        .json(&fixtures::page_visit(&fixtures::session_id(), "/", fixtures::now_ms()))
        .await
        .assert_status_ok();
    let body: Value = server.get("/health").await.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["cache_connected"], false);
    server.get("/health/ready").await.assert_status_ok();

    // Losing the store takes the service out of rotation.
    health().store.set_unhealthy("connection refused");
    let body: Value = server.get("/health").await.json();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(
        server.get("/health/ready").await.status_code(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    server.get("/health/live").await.assert_status_ok();

    health().store.set_healthy();
    health().cache.set_healthy();
}
