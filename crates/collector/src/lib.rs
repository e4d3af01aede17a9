//! Interaction collector.
//!
//! Runs in the visitor's context: observes navigation, clicks and form
//! activity, folds rapid repeat clicks, batches interactions, and delivers
//! them to the ingestion API with bounded retries. Finalization drains all
//! in-flight work and sends one exit beacon.
//!
//! All state is owned by a [`Collector`] instance.

pub mod batch;
pub mod collector;
pub mod config;
pub mod debounce;
pub mod error;
pub mod inflight;
pub mod retry;
pub mod transport;

pub use collector::{Collector, FinalConfiguration, SessionContext};
pub use config::CollectorConfig;
pub use error::DeliveryError;
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, Payload, Transport};
