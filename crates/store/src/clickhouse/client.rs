//! ClickHouse client wrapper.

use ::clickhouse::Client;
use tracing::{debug, error, info};
use tracking_core::{Error, Result, StoreErrorCode};

use super::config::ClickHouseConfig;
use super::schema::{all_tables, create_database};

/// ClickHouse client wrapper bound to the tracking database.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client.
    pub fn new(config: ClickHouseConfig) -> Self {
        let inner = Self::base_client(&config).with_database(&config.database);

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Self { inner, config }
    }

    fn base_client(config: &ClickHouseConfig) -> Client {
        let mut client = Client::default().with_url(&config.url);

        if let Some(ref user) = config.username {
            client = client.with_user(user);
        }

        if let Some(ref pass) = config.password {
            client = client.with_password(pass);
        }

        client
    }

    /// Returns the inner clickhouse client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    /// Check ClickHouse connection health.
    pub async fn check_connection(&self) -> bool {
        match self.inner.query("SELECT 1").fetch_one::<u8>().await {
            Ok(_) => {
                debug!("ClickHouse connection healthy");
                true
            }
            Err(e) => {
                error!(error = %e, "ClickHouse health check failed");
                false
            }
        }
    }

    /// Create the database and all tables if missing.
    pub async fn init_schema(&self) -> Result<()> {
        // The database may not exist yet, so this runs without one selected.
        Self::base_client(&self.config)
            .query(&create_database(&self.config.database))
            .execute()
            .await
            .map_err(|e| {
                Error::store(
                    StoreErrorCode::Unavailable,
                    format!("failed to create database: {}", e),
                )
            })?;

        for ddl in all_tables() {
            self.inner.query(ddl).execute().await.map_err(|e| {
                Error::store(
                    StoreErrorCode::Unavailable,
                    format!("failed to execute DDL: {}", e),
                )
            })?;
        }

        info!(database = %self.config.database, "ClickHouse schema initialized");
        Ok(())
    }
}
