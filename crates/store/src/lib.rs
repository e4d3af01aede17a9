//! Durable event store for the visitor tracking engine.
//!
//! The store is the source of truth: session records plus append-only
//! interaction, selection, snapshot, and performance logs.

pub mod clickhouse;
pub mod config;
pub mod finalizer;
pub mod memory;
pub mod store;
pub mod sweep;

pub use config::{connect, StoreBackend, StoreConfig};
pub use finalizer::{FinalizeOutcome, SessionFinalizer};
pub use memory::MemoryStore;
pub use store::{EventStore, SessionChange, SessionRollup};
pub use sweep::{sweep_idle_sessions, SweepPolicy, SweepReport};
