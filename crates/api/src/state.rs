//! Application state shared across handlers.

use std::sync::Arc;

use analytics::{AnalyticsConfig, AnalyticsEngine};
use event_store::{EventStore, SessionFinalizer};
use session_cache::SessionCache;
use tracking_core::CompletionSchema;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Durable event store (ClickHouse in production, memory in tests)
    pub store: Arc<dyn EventStore>,
    /// Ephemeral session cache
    pub cache: Arc<dyn SessionCache>,
    pub finalizer: SessionFinalizer,
    pub analytics: Arc<AnalyticsEngine>,
    /// Recomputes snapshot completion at ingestion
    pub completion: CompletionSchema,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EventStore>,
        cache: Arc<dyn SessionCache>,
        analytics_config: AnalyticsConfig,
    ) -> Self {
        let completion = analytics_config.completion.clone();
        Self {
            finalizer: SessionFinalizer::new(store.clone(), completion.clone()),
            analytics: Arc::new(AnalyticsEngine::new(
                store.clone(),
                cache.clone(),
                analytics_config,
            )),
            store,
            cache,
            completion,
        }
    }
}
