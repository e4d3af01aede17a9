//! Ephemeral session cache.
//!
//! Holds the active-session set and a short click timeline per session for
//! real-time dashboard reads. Never authoritative: the durable store is the
//! source of truth, and every read here has a zero/empty fallback.

pub mod best_effort;
pub mod cache;
pub mod config;
pub mod moka_cache;

pub use best_effort::*;
pub use cache::{CacheCounters, ClickRecord, SessionCache};
pub use config::CacheConfig;
pub use moka_cache::MokaSessionCache;
