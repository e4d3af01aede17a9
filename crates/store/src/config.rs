//! Store backend selection.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use tracking_core::Result;

use crate::clickhouse::{ClickHouseClient, ClickHouseConfig, ClickHouseStore};
use crate::memory::MemoryStore;
use crate::store::EventStore;

/// Which durable backend to run against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    ClickHouse,
    /// Process-local, lost on restart.
    Memory,
}

/// `[store]` section of the service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,
}

/// Build the configured backend, creating the schema if asked to.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn EventStore>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory event store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::ClickHouse => {
            let client = ClickHouseClient::new(config.clickhouse.clone());
            if config.clickhouse.init_schema {
                client.init_schema().await?;
            }
            Ok(Arc::new(ClickHouseStore::new(client)))
        }
    }
}
