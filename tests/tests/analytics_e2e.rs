//! Dashboard endpoints over data ingested through the tracking API.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use serde_json::{json, Value};

async fn visit(server: &TestServer, user_agent: &str, session_id: &str, now: i64) {
    server
        .post("/api/track/interactions")
        .add_header("User-Agent", user_agent)
        .json(&fixtures::batch(vec![
            fixtures::page_visit(session_id, "/", now - 90_000),
            fixtures::click(session_id, "start-config", 1, now - 30_000),
        ]))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_overview_separates_bots() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let now = fixtures::now_ms();

    let visitor = fixtures::session_id();
    let crawler = fixtures::session_id();
    visit(&server, fixtures::CHROME_UA, &visitor, now).await;
    visit(&server, fixtures::GOOGLEBOT_UA, &crawler, now).await;

    server
        .post("/api/track/conversion")
        .json(&json!({"sessionId": visitor}))
        .await
        .assert_status_ok();

    let response = server
        .get("/api/analytics/overview")
        .add_query_param("range", "24h")
        .add_query_param("ga4ActiveUsers", 1)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["totalSessions"], 2);
    assert_eq!(body["humanSessions"], 1);
    assert_eq!(body["bots"]["bot"], 1);
    assert_eq!(body["bots"]["real"], 1);
    assert_eq!(body["conversionRate"], 100.0);
    assert_eq!(body["ga4"]["ratioPercentage"], 100.0);
    assert_eq!(body["ga4"]["band"], "excellent");
    assert!(body["trafficSources"].is_array());
}

#[tokio::test]
async fn test_overview_defaults_and_empty_store() {
    let ctx = TestContext::new();
    let response = ctx.server().get("/api/analytics/overview").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["totalSessions"], 0);
    assert_eq!(body["bounceRate"], 0.0);
    assert_eq!(body["conversionRate"], 0.0);
    // No GA4 figure supplied, no alignment block.
    assert!(body.get("ga4").is_none());
}

#[tokio::test]
async fn test_realtime_counts_recent_activity() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let now = fixtures::now_ms();

    visit(&server, fixtures::CHROME_UA, &fixtures::session_id(), now).await;
    visit(&server, fixtures::CHROME_UA, &fixtures::session_id(), now).await;

    let response = server.get("/api/analytics/realtime").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["active"], 2);
    assert_eq!(body["today"], 2);
    assert!(body["windowSecs"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_invalid_ranges_are_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    for range in ["0d", "1y", "d", "400d"] {
        let response = server
            .get("/api/analytics/overview")
            .add_query_param("range", range)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "range {}", range);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALID_001");
    }
}

#[tokio::test]
async fn test_clicks_for_invalid_session_id() {
    let ctx = TestContext::new();
    let long_id = "x".repeat(200);
    let response = ctx
        .server()
        .get(&format!("/api/analytics/sessions/{}/clicks", long_id))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
