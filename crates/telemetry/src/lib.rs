//! Telemetry for the visitor tracking engine.
//!
//! Counters live in-process; the worker periodically writes them to the
//! durable store as server-side performance metrics.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
