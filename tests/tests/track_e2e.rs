//! End-to-end tests for the tracking endpoints.
//!
//! POST /api/track/* → router → memory store + moka cache.

use axum::http::StatusCode;
use integration_tests::{fixtures, setup::TestContext};
use serde_json::{json, Value};
use tracking_core::SessionStatus;

#[tokio::test]
async fn test_interactions_object_format_creates_session() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let sid = fixtures::session_id();
    let now = fixtures::now_ms();

    let response = server
        .post("/api/track/interactions")
        .add_header("User-Agent", fixtures::CHROME_UA)
        .add_header("CF-IPCountry", "de")
        .json(&fixtures::batch(vec![
            fixtures::page_visit(&sid, "/", now - 2000),
            fixtures::click(&sid, "start-config", 3, now - 1000),
        ]))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["received"], 2);
    assert_eq!(body["sessionsCreated"], 1);

    let session = ctx.store.get_session(&sid).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(session.event_count, 2);
    assert_eq!(session.start_time.timestamp_millis(), now - 2000);
    assert_eq!(session.last_activity.timestamp_millis(), now - 1000);
    assert_eq!(session.country.as_deref(), Some("DE"));
    assert_eq!(session.utm_source.as_deref(), Some("newsletter"));
    assert!(session.end_time.is_none());

    let interactions = ctx.store.list_interactions(&sid).await.unwrap();
    assert_eq!(interactions.len(), 2);
}

#[tokio::test]
async fn test_interactions_single_and_array_formats() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let sid = fixtures::session_id();
    let now = fixtures::now_ms();

    server
        .post("/api/track/interactions")
        .json(&fixtures::page_visit(&sid, "/", now))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/track/interactions")
        .json(&json!([
            fixtures::click(&sid, "a", 1, now),
            fixtures::click(&sid, "b", 1, now)
        ]))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["received"], 2);
    // Already created by the first request.
    assert_eq!(body["sessionsCreated"], 0);

    let session = ctx.store.get_session(&sid).await.unwrap().unwrap();
    assert_eq!(session.event_count, 3);
}

#[tokio::test]
async fn test_clicks_reach_the_live_timeline() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let sid = fixtures::session_id();
    let now = fixtures::now_ms();

    server
        .post("/api/track/interactions")
        .json(&fixtures::batch(vec![
            fixtures::click(&sid, "color-red", 5, now - 500),
            fixtures::click(&sid, "color-blue", 1, now),
        ]))
        .await
        .assert_status_ok();

    let response = server
        .get(&format!("/api/analytics/sessions/{}/clicks", sid))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let clicks = body["clicks"].as_array().unwrap();
    assert_eq!(clicks.len(), 2);
    assert_eq!(clicks[0]["elementId"], "color-red");
    assert_eq!(clicks[0]["clickCount"], 5);
}

#[tokio::test]
async fn test_selection_and_snapshot() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let sid = fixtures::session_id();

    server
        .post("/api/track/selections")
        .json(&fixtures::selection(&sid, "roofType", "gable", 31_500_000))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/track/snapshots")
        .json(&fixtures::snapshot(&sid, fixtures::required_configuration(), 32_000_000))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    // Required fields only: 70% weight.
    assert_eq!(body["completionPercentage"], 70);

    let session = ctx.store.get_session(&sid).await.unwrap().unwrap();
    assert_eq!(session.total_price, Some(32_000_000));
    assert_eq!(session.configuration_data["houseModel"], "villa");

    let snapshots = ctx.store.list_snapshots(&sid).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].completion_percentage, 70);
}

#[tokio::test]
async fn test_client_completion_is_ignored() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let sid = fixtures::session_id();

    let mut body = fixtures::snapshot(&sid, json!({"houseModel": "villa"}), 0);
    body["completionPercentage"] = json!(100);

    let response = server.post("/api/track/snapshots").json(&body).await;
    response.assert_status_ok();
    let body: Value = response.json();
    // One of six required fields: round(70 / 6).
    assert_eq!(body["completionPercentage"], 12);
}

#[tokio::test]
async fn test_metrics_are_accepted() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/track/metrics")
        .json(&json!({
            "sessionId": fixtures::session_id(),
            "metricName": "api_latency_ms",
            "value": 84.0,
            "endpoint": "/api/price"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_finalize_is_idempotent() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let sid = fixtures::session_id();
    let now = fixtures::now_ms();

    server
        .post("/api/track/interactions")
        .json(&fixtures::page_visit(&sid, "/", now - 60_000))
        .await
        .assert_status_ok();

    // Beacons arrive as text/plain.
    let first = server
        .post("/api/track/finalize")
        .content_type("text/plain;charset=UTF-8")
        .text(fixtures::finalize(&sid, Some(now - 1000)).to_string())
        .await;
    first.assert_status_ok();
    let first: Value = first.json();
    assert_eq!(first["written"], true);
    assert_eq!(first["endTime"], now - 1000);
    assert_eq!(first["status"], "ACTIVE");

    let second = server
        .post("/api/track/finalize")
        .json(&fixtures::finalize(&sid, Some(now)))
        .await;
    second.assert_status_ok();
    let second: Value = second.json();
    assert_eq!(second["written"], false);
    assert_eq!(second["endTime"], now - 1000);

    let session = ctx.store.get_session(&sid).await.unwrap().unwrap();
    assert_eq!(session.end_time.unwrap().timestamp_millis(), now - 1000);
    assert_eq!(session.status, SessionStatus::Active);
}

#[tokio::test]
async fn test_finalize_with_configuration_logs_exit_snapshot() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let sid = fixtures::session_id();

    server
        .post("/api/track/interactions")
        .json(&fixtures::page_visit(&sid, "/configurator", fixtures::now_ms()))
        .await
        .assert_status_ok();

    server
        .post("/api/track/finalize")
        .json(&json!({
            "sessionId": sid,
            "configurationData": fixtures::required_configuration(),
            "totalPrice": 29_900_000
        }))
        .await
        .assert_status_ok();

    let snapshots = ctx.store.list_snapshots(&sid).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].trigger_event.as_str(), "page_exit");

    let session = ctx.store.get_session(&sid).await.unwrap().unwrap();
    assert_eq!(session.total_price, Some(29_900_000));
}

#[tokio::test]
async fn test_finalize_unknown_session_is_noop() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let sid = fixtures::session_id();

    let response = server
        .post("/api/track/finalize")
        .json(&fixtures::finalize(&sid, None))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["sessionFound"], false);
    assert!(ctx.store.get_session(&sid).await.unwrap().is_none());
}

#[tokio::test]
async fn test_conversion_completes_session() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let sid = fixtures::session_id();
    let now = fixtures::now_ms();

    server
        .post("/api/track/interactions")
        .json(&fixtures::page_visit(&sid, "/", now - 120_000))
        .await
        .assert_status_ok();
    server
        .post("/api/track/finalize")
        .json(&fixtures::finalize(&sid, Some(now - 60_000)))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/track/conversion")
        .json(&json!({"sessionId": sid, "source": "payment"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "COMPLETED");
    assert_eq!(body["written"], true);

    let session = ctx.store.get_session(&sid).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    // The earlier finalize keeps its end time.
    assert_eq!(session.end_time.unwrap().timestamp_millis(), now - 60_000);
}
