//! Session lifecycle across the API and the background jobs.

use std::sync::Arc;

use chrono::{Duration, Utc};
use event_store::{sweep_idle_sessions, MemoryStore, SweepPolicy};
use integration_tests::{fixtures, setup::TestContext};
use serde_json::Value;
use session_cache::MokaSessionCache;
use tracking_core::SessionStatus;

fn one_hour_policy() -> SweepPolicy {
    SweepPolicy {
        idle_hours: 1,
        batch_limit: 100,
    }
}

#[tokio::test]
async fn test_idle_sessions_are_closed_by_the_sweep() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let two_hours_ago = (Utc::now() - Duration::hours(2)).timestamp_millis();

    let bounced = fixtures::session_id();
    server
        .post("/api/track/interactions")
        .json(&fixtures::page_visit(&bounced, "/", two_hours_ago))
        .await
        .assert_status_ok();

    let submitted = fixtures::session_id();
    server
        .post("/api/track/interactions")
        .json(&fixtures::batch(vec![
            fixtures::page_visit(&submitted, "/contact", two_hours_ago),
            fixtures::form_submit(&submitted, "contact", two_hours_ago + 1000),
        ]))
        .await
        .assert_status_ok();

    let fresh = fixtures::session_id();
    server
        .post("/api/track/interactions")
        .json(&fixtures::page_visit(&fresh, "/", fixtures::now_ms()))
        .await
        .assert_status_ok();

    let report = sweep_idle_sessions(ctx.store.as_ref(), &one_hour_policy(), Utc::now())
        .await
        .unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.completed, 1);

    let status = |s: Option<tracking_core::Session>| s.unwrap().status;
    assert_eq!(status(ctx.store.get_session(&bounced).await.unwrap()), SessionStatus::Abandoned);
    assert_eq!(status(ctx.store.get_session(&submitted).await.unwrap()), SessionStatus::Completed);
    assert_eq!(status(ctx.store.get_session(&fresh).await.unwrap()), SessionStatus::Active);

    // A late beacon still records the end time but cannot reopen the session.
    let body: Value = server
        .post("/api/track/finalize")
        .json(&fixtures::finalize(&bounced, None))
        .await
        .json();
    assert_eq!(body["status"], "ABANDONED");
}

#[tokio::test]
async fn test_metrics_flush_lands_in_performance_log() {
    let store = Arc::new(MemoryStore::new());
    let ctx = TestContext::with_backends(store.clone(), Arc::new(MokaSessionCache::default()));

    ctx.server()
        .post("/api/track/interactions")
        .json(&fixtures::page_visit(&fixtures::session_id(), "/", fixtures::now_ms()))
        .await
        .assert_status_ok();

    let written = worker::jobs::flush_metrics(ctx.store.as_ref(), Utc::now())
        .await
        .unwrap();
    assert!(written > 0);
    assert_eq!(store.performance_metrics().len(), written);
    assert!(store
        .performance_metrics()
        .iter()
        .any(|m| m.metric_name == "server.interactions_accepted"));
}

#[tokio::test]
async fn test_store_probe_tracks_health() {
    let ctx = TestContext::new();
    assert!(worker::jobs::probe_store(ctx.store.as_ref()).await);
}
