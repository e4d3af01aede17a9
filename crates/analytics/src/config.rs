//! Aggregation policy.

use serde::Deserialize;
use tracking_core::CompletionSchema;

use crate::bots::BotPolicy;
use crate::ga4::Ga4Bands;

/// `[analytics]` section of the service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub completion: CompletionSchema,
    #[serde(default)]
    pub bots: BotPolicy,
    #[serde(default)]
    pub ga4: Ga4Bands,
    /// Window for the "active now" counter.
    #[serde(default = "default_realtime_window_secs")]
    pub realtime_window_secs: u64,
}

fn default_realtime_window_secs() -> u64 {
    5 * 60
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            completion: CompletionSchema::default(),
            bots: BotPolicy::default(),
            ga4: Ga4Bands::default(),
            realtime_window_secs: default_realtime_window_secs(),
        }
    }
}

impl AnalyticsConfig {
    pub fn realtime_window(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.realtime_window_secs)
    }
}
