//! Core types, wire formats, and validation for the visitor tracking engine.

pub mod completion;
pub mod error;
pub mod events;
pub mod limits;
pub mod range;
pub mod schema;
pub mod session;
pub mod wire;

pub use completion::CompletionSchema;
pub use error::{Error, Result, StoreErrorCode, ValidationErrorCode};
pub use events::*;
pub use range::TimeRange;
pub use session::*;
pub use wire::*;
