//! Collector → HTTP → tracking API → memory store.

use std::time::Duration;

use collector::{Collector, CollectorConfig, FinalConfiguration, SessionContext};
use event_store::EventStore;
use integration_tests::{fixtures, setup::TestContext};
use tracking_core::{event_types, Session};

async fn wait_for_session<F>(store: &dyn EventStore, session_id: &str, ready: F) -> Session
where
    F: Fn(&Session) -> bool,
{
    for _ in 0..100 {
        if let Some(session) = store.get_session(session_id).await.unwrap() {
            if ready(&session) {
                return session;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("session {} never reached the expected state", session_id);
}

fn context(session_id: &str) -> SessionContext {
    SessionContext {
        url: Some("https://configurator.example.com/?utm_source=ads".to_string()),
        ..SessionContext::new(session_id)
    }
}

#[tokio::test]
async fn test_collector_visit_end_to_end() {
    let ctx = TestContext::new();
    let addr = ctx.spawn().await;
    let sid = fixtures::session_id();

    let config = CollectorConfig::new(format!("http://{}", addr));
    let collector = Collector::with_http(&config, context(&sid)).unwrap();

    collector.observe_navigation("/", Some("Home"));
    for _ in 0..3 {
        collector.observe_click("start-config", "cta", Some("button"), Some("Start"));
    }
    collector.drain().await;
    collector.track_selection("roofType", "gable", None, 31_500_000, 0);
    collector.drain().await;
    assert_eq!(collector.buffered(), 0);
    assert_eq!(collector.in_flight(), 0);

    let interactions = ctx.store.list_interactions(&sid).await.unwrap();
    let clicks: Vec<_> = interactions
        .iter()
        .filter(|e| e.event_type == event_types::CLICK)
        .collect();
    assert_eq!(clicks.len(), 1);
    assert_eq!(clicks[0].additional_data.click_count(), 3);

    collector
        .finalize(Some(FinalConfiguration {
            data: fixtures::required_configuration(),
            total_price: 31_500_000,
        }))
        .await;

    // The beacon is fire-and-forget.
    let session = wait_for_session(ctx.store.as_ref(), &sid, |s| s.end_time.is_some()).await;
    assert_eq!(session.total_price, Some(31_500_000));
    assert_eq!(session.utm_source.as_deref(), Some("ads"));

    let interactions = ctx.store.list_interactions(&sid).await.unwrap();
    assert!(interactions
        .iter()
        .any(|e| e.event_type == event_types::PAGE_EXIT));
}

#[tokio::test]
async fn test_dropped_collector_still_finalizes() {
    let ctx = TestContext::new();
    let addr = ctx.spawn().await;
    let sid = fixtures::session_id();

    let config = CollectorConfig::new(format!("http://{}", addr));
    {
        let collector = Collector::with_http(&config, context(&sid)).unwrap();
        collector.observe_navigation("/configurator", None);
        collector.drain().await;
        // Left in an open debounce window when the collector goes away.
        collector.observe_click("color-red", "option", None, None);
    }

    let session = wait_for_session(ctx.store.as_ref(), &sid, |s| s.end_time.is_some()).await;
    assert!(session.event_count >= 1);
    assert!(session.end_time.is_some());
}

#[tokio::test]
async fn test_long_field_value_does_not_drop_the_batch() {
    let ctx = TestContext::new();
    let addr = ctx.spawn().await;
    let sid = fixtures::session_id();

    let config = CollectorConfig::new(format!("http://{}", addr));
    let collector = Collector::with_http(&config, context(&sid)).unwrap();

    collector.observe_navigation("/contact", None);
    collector.observe_field_change("email", "visitor@example.com", None, Some("contact"), Some("email"));
    let message = "x".repeat(tracking_core::limits::MAX_FIELD_VALUE_LEN + 1);
    collector.observe_field_change("message", &message, None, Some("contact"), Some("textarea"));
    collector.observe_form_submit("contact", Some(2));
    collector.drain().await;

    let interactions = ctx.store.list_interactions(&sid).await.unwrap();
    assert_eq!(interactions.len(), 4);
    assert!(interactions.iter().any(|e| e.is_form_submit()));
    let stored = interactions
        .iter()
        .find(|e| e.element_id.as_deref() == Some("message"))
        .unwrap();
    assert_eq!(
        stored.selection_value.as_ref().map(|v| v.chars().count()),
        Some(tracking_core::limits::MAX_FIELD_VALUE_LEN)
    );
}
