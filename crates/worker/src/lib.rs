//! Background workers for the visitor tracking engine.
//!
//! Handles periodic workflows:
//! - Idle sweep (closes sessions that never sent a finalize)
//! - Metrics flush (in-process counters → performance metric rows)
//! - Store health probe (drives readiness)

pub mod config;
pub mod jobs;
pub mod scheduler;

pub use config::WorkerConfig;
pub use jobs::{flush_metrics, probe_store};
pub use scheduler::WorkerScheduler;
