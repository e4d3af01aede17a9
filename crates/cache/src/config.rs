//! Cache TTLs and capacities.

use std::time::Duration;

use serde::Deserialize;

/// `[cache]` section of the service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Sliding window for active-session membership.
    #[serde(default = "default_active_ttl_secs")]
    pub active_ttl_secs: u64,
    /// Idle lifetime of a session's click list.
    #[serde(default = "default_click_ttl_secs")]
    pub click_ttl_secs: u64,
    #[serde(default = "default_max_clicks_per_session")]
    pub max_clicks_per_session: usize,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
}

fn default_active_ttl_secs() -> u64 {
    30 * 60
}

fn default_click_ttl_secs() -> u64 {
    30 * 60
}

fn default_max_clicks_per_session() -> usize {
    100
}

fn default_max_sessions() -> u64 {
    100_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            active_ttl_secs: default_active_ttl_secs(),
            click_ttl_secs: default_click_ttl_secs(),
            max_clicks_per_session: default_max_clicks_per_session(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl CacheConfig {
    pub fn active_ttl(&self) -> Duration {
        Duration::from_secs(self.active_ttl_secs)
    }

    pub fn click_ttl(&self) -> Duration {
        Duration::from_secs(self.click_ttl_secs)
    }
}
