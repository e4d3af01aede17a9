//! HTTP ingestion and analytics API for the visitor tracking engine.

pub mod extractors;
pub mod pipeline;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
