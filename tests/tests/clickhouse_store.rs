//! The tracking API over a real ClickHouse store.
//!
//! Requires Docker (or `TRACKING_TEST_CLICKHOUSE_URL`). Run with
//! `cargo test -p integration-tests --test clickhouse_store -- --ignored`.

use std::sync::Arc;

use chrono::Utc;
use event_store::{clickhouse::ClickHouseConfig, StoreBackend, StoreConfig};
use integration_tests::{containers::TestContainers, fixtures, setup::TestContext};
use serde_json::{json, Value};
use session_cache::MokaSessionCache;
use tracking_core::{SessionMetadata, SessionStatus, SessionUpdate};

async fn clickhouse_context(containers: &TestContainers) -> TestContext {
    let config = StoreConfig {
        backend: StoreBackend::ClickHouse,
        clickhouse: ClickHouseConfig {
            url: containers.clickhouse_url.clone(),
            database: containers.clickhouse_database.clone(),
            username: containers.clickhouse_username.clone(),
            password: containers.clickhouse_password.clone(),
            init_schema: true,
            ..Default::default()
        },
    };
    let store = event_store::connect(&config)
        .await
        .expect("Failed to connect to ClickHouse");
    TestContext::with_backends(store, Arc::new(MokaSessionCache::default()))
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_visit_lifecycle_on_clickhouse() {
    let containers = TestContainers::start().await;
    let ctx = clickhouse_context(&containers).await;
    let server = ctx.server();
    let sid = fixtures::session_id();
    let now = fixtures::now_ms();

    server
        .post("/api/track/interactions")
        .add_header("User-Agent", fixtures::CHROME_UA)
        .json(&fixtures::batch(vec![
            fixtures::page_visit(&sid, "/", now - 120_000),
            fixtures::click(&sid, "start-config", 2, now - 90_000),
            fixtures::form_submit(&sid, "contact", now - 60_000),
        ]))
        .await
        .assert_status_ok();

    server
        .post("/api/track/snapshots")
        .json(&fixtures::snapshot(&sid, fixtures::required_configuration(), 31_500_000))
        .await
        .assert_status_ok();

    let first: Value = server
        .post("/api/track/finalize")
        .json(&fixtures::finalize(&sid, Some(now - 30_000)))
        .await
        .json();
    assert_eq!(first["written"], true);

    let second: Value = server
        .post("/api/track/finalize")
        .json(&fixtures::finalize(&sid, Some(now)))
        .await
        .json();
    assert_eq!(second["written"], false);

    let session = ctx.store.get_session(&sid).await.unwrap().unwrap();
    assert_eq!(session.event_count, 3);
    assert_eq!(session.end_time.unwrap().timestamp_millis(), now - 30_000);
    assert_eq!(session.total_price, Some(31_500_000));
    assert_eq!(ctx.store.list_interactions(&sid).await.unwrap().len(), 3);
    assert_eq!(ctx.store.list_snapshots(&sid).await.unwrap().len(), 1);

    let overview: Value = server
        .get("/api/analytics/overview")
        .add_query_param("range", "24h")
        .await
        .json();
    assert!(overview["totalSessions"].as_u64().unwrap() >= 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_status_transitions_are_monotonic_on_clickhouse() {
    let containers = TestContainers::start().await;
    let ctx = clickhouse_context(&containers).await;
    let sid = fixtures::session_id();
    let now = Utc::now();

    let (_, created) = ctx
        .store
        .create_or_get_session(&sid, &SessionMetadata::default(), now)
        .await
        .unwrap();
    assert!(created);
    let (_, created) = ctx
        .store
        .create_or_get_session(&sid, &SessionMetadata::default(), now)
        .await
        .unwrap();
    assert!(!created);

    ctx.store
        .update_session(&sid, &SessionUpdate::transition(SessionStatus::Completed, now))
        .await
        .unwrap();
    let change = ctx
        .store
        .update_session(&sid, &SessionUpdate::transition(SessionStatus::Abandoned, now))
        .await
        .unwrap();
    assert_eq!(change.session.status, SessionStatus::Completed);

    let session = ctx.store.get_session(&sid).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(json!(session.status), json!("COMPLETED"));
}
