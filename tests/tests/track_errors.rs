//! Error paths of the tracking endpoints.
//!
//! Validation failures are 400 and final. Store failures are 503 and safe to
//! retry. Cache failures never reach the client.

use std::sync::Arc;

use axum::http::StatusCode;
use integration_tests::{
    fixtures,
    mocks::{DownCache, FlakyStore},
    setup::TestContext,
};
use serde_json::{json, Value};
use session_cache::MokaSessionCache;

#[tokio::test]
async fn test_invalid_json_is_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/track/interactions")
        .content_type("application/json")
        .text("{not json")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

#[tokio::test]
async fn test_oversized_batch_is_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let sid = fixtures::session_id();
    let now = fixtures::now_ms();

    let events: Vec<Value> = (0..101).map(|i| fixtures::click(&sid, "cta", 1, now - i)).collect();
    let response = server
        .post("/api/track/interactions")
        .json(&fixtures::batch(events))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_002");
    assert!(ctx.store.get_session(&sid).await.unwrap().is_none());
}

#[tokio::test]
async fn test_future_timestamp_rejects_batch() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let sid = fixtures::session_id();
    let now = fixtures::now_ms();

    let response = server
        .post("/api/track/interactions")
        .json(&fixtures::batch(vec![
            fixtures::page_visit(&sid, "/", now),
            fixtures::click(&sid, "cta", 1, now + 10 * 60 * 1000),
        ]))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_004");
    assert_eq!(body["details"].as_array().map(Vec::len), Some(1));
    // All-or-nothing: the valid page visit was not stored either.
    assert!(ctx.store.get_session(&sid).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_click_shape_is_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/track/interactions")
        .json(&json!({
            "sessionId": fixtures::session_id(),
            "eventType": "click",
            "category": "cta",
            "additionalData": {"clickCount": 0}
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_session_id_on_finalize() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/track/finalize")
        .json(&json!({"sessionId": "  "}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_outage_is_retryable() {
    let store = FlakyStore::new();
    let ctx = TestContext::with_backends(Arc::new(store.clone()), Arc::new(MokaSessionCache::default()));
    let server = ctx.server();
    let sid = fixtures::session_id();
    let payload = fixtures::page_visit(&sid, "/", fixtures::now_ms());

    store.set_failing(true);
    let response = server.post("/api/track/interactions").json(&payload).await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.header("Retry-After"), "1");
    let body: Value = response.json();
    assert_eq!(body["code"], "STORE_001");

    // The same request succeeds once the store is back.
    store.set_failing(false);
    server
        .post("/api/track/interactions")
        .json(&payload)
        .await
        .assert_status_ok();
    assert_eq!(store.inner().interaction_count(), 1);
}

#[tokio::test]
async fn test_store_outage_on_analytics() {
    let store = FlakyStore::new();
    store.set_failing(true);
    let ctx = TestContext::with_backends(Arc::new(store), Arc::new(MokaSessionCache::default()));

    let response = ctx.server().get("/api/analytics/overview?range=24h").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_cache_outage_does_not_fail_ingestion() {
    let cache = DownCache::default();
    let ctx = TestContext::with_backends(
        Arc::new(event_store::MemoryStore::new()),
        Arc::new(cache.clone()),
    );
    let server = ctx.server();
    let sid = fixtures::session_id();
    let now = fixtures::now_ms();

    server
        .post("/api/track/interactions")
        .json(&fixtures::batch(vec![
            fixtures::page_visit(&sid, "/", now - 1000),
            fixtures::click(&sid, "cta", 1, now),
        ]))
        .await
        .assert_status_ok();
    assert!(cache.attempts() >= 1);
    assert_eq!(ctx.store.list_interactions(&sid).await.unwrap().len(), 2);

    // Dashboard reads fall back to empty values.
    let clicks: Value = server
        .get(&format!("/api/analytics/sessions/{}/clicks", sid))
        .await
        .json();
    assert_eq!(clicks["clicks"], json!([]));

    let realtime: Value = server.get("/api/analytics/realtime").await.json();
    assert_eq!(realtime["active"], 0);
}

#[tokio::test]
async fn test_invalid_range() {
    let ctx = TestContext::new();
    let response = ctx.server().get("/api/analytics/overview?range=forever").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
