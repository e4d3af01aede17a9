//! Common test setup functions.

use std::net::SocketAddr;
use std::sync::Arc;

use analytics::AnalyticsConfig;
use api::{router, state::AppState};
use axum::Router;
use axum_test::TestServer;
use event_store::{EventStore, MemoryStore};
use session_cache::{MokaSessionCache, SessionCache};
use telemetry::health;

/// Router wired to the production handlers over in-process backends.
pub struct TestContext {
    pub store: Arc<dyn EventStore>,
    pub cache: Arc<dyn SessionCache>,
    pub router: Router,
}

impl TestContext {
    /// Memory store and moka cache.
    pub fn new() -> Self {
        Self::with_backends(Arc::new(MemoryStore::new()), Arc::new(MokaSessionCache::default()))
    }

    pub fn with_backends(store: Arc<dyn EventStore>, cache: Arc<dyn SessionCache>) -> Self {
        health().store.set_healthy();

        let state = AppState::new(store.clone(), cache.clone(), AnalyticsConfig::default());
        Self {
            store,
            cache,
            router: router(state),
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }

    /// Serve the router on an ephemeral local port for real HTTP clients.
    pub async fn spawn(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let app = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        addr
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
