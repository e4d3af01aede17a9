//! ClickHouse backend.

mod client;
mod config;
mod rows;
pub mod schema;
mod store;

pub use client::ClickHouseClient;
pub use config::ClickHouseConfig;
pub use rows::*;
pub use store::ClickHouseStore;
