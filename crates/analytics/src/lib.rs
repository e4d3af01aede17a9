//! Aggregation engine.
//!
//! Read-side computations over session rollups from the durable store, plus
//! coarse real-time numbers from the session cache. Nothing here writes.

pub mod bots;
pub mod bounce;
pub mod config;
pub mod engine;
pub mod funnel;
pub mod ga4;
pub mod sources;

pub use bots::{BotClass, BotClassifier, BotPolicy, BotReport};
pub use config::AnalyticsConfig;
pub use engine::{AnalyticsEngine, AnalyticsOverview, RealtimeStats};
pub use funnel::{Funnel, FunnelStage};
pub use ga4::{AlignmentBand, Ga4Alignment, Ga4Bands};
pub use sources::{traffic_source, TrafficSource};

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `part / whole` as a percentage, 0 when `whole` is 0.
pub(crate) fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
