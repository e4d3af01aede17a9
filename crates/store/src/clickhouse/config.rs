//! ClickHouse configuration.

use serde::{Deserialize, Serialize};

/// ClickHouse client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// ClickHouse HTTP URL
    #[serde(default = "default_url")]
    pub url: String,
    /// Database name
    #[serde(default = "default_database")]
    pub database: String,
    /// Username (optional)
    pub username: Option<String>,
    /// Password (optional)
    pub password: Option<String>,
    /// Create the database and tables on startup
    #[serde(default = "default_init_schema")]
    pub init_schema: bool,
    /// Idle time after which a per-session update lock is dropped (seconds)
    #[serde(default = "default_lock_idle_secs")]
    pub lock_idle_secs: u64,
}

fn default_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_database() -> String {
    "tracking".to_string()
}

fn default_init_schema() -> bool {
    true
}

fn default_lock_idle_secs() -> u64 {
    300
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            database: default_database(),
            username: None,
            password: None,
            init_schema: default_init_schema(),
            lock_idle_secs: default_lock_idle_secs(),
        }
    }
}
