//! Unified error types for the tracking engine.
//!
//! Error codes:
//! - VALID_001-004: Validation errors (client-visible, never retried)
//! - STORE_001-003: Durable store errors (transient, retried by the collector)
//! - CACHE_001: Ephemeral cache unavailable (logged only, never surfaced)
//! - DUP_001: Duplicate event (reserved, not detected yet)

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Invalid JSON / invalid field
    InvalidFormat,
    /// VALID_002: Batch exceeds the event count limit
    BatchTooLarge,
    /// VALID_003: Payload or blob exceeds its byte limit
    PayloadTooLarge,
    /// VALID_004: Timestamp outside the accepted window
    InvalidTimestamp,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "VALID_001",
            Self::BatchTooLarge => "VALID_002",
            Self::PayloadTooLarge => "VALID_003",
            Self::InvalidTimestamp => "VALID_004",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::PayloadTooLarge => 413,
            _ => 400,
        }
    }
}

/// Durable store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// STORE_001: Store unreachable
    Unavailable,
    /// STORE_002: Write rejected or interrupted
    WriteFailed,
    /// STORE_003: Read query failed
    QueryFailed,
}

impl StoreErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable => "STORE_001",
            Self::WriteFailed => "STORE_002",
            Self::QueryFailed => "STORE_003",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        503
    }
}

/// Unified error type for the tracking engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Validation error with code.
    #[error("[{code}] {message}")]
    ValidationWithCode {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Durable store failure. Always transient from the client's point of view.
    #[error("[{code}] {message}")]
    TransientStore {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("[CACHE_001] cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("[DUP_001] duplicate event: {0}")]
    DuplicateEvent(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error with code.
    pub fn validation_code(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::ValidationWithCode {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a transient store error.
    pub fn store(code: StoreErrorCode, msg: impl Into<String>) -> Self {
        Self::TransientStore {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn cache_unavailable(msg: impl Into<String>) -> Self {
        Self::CacheUnavailable(msg.into())
    }

    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound(session_id.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationWithCode { http_status, .. } => *http_status,
            Self::TransientStore { http_status, .. } => *http_status,
            Self::Validation(_) => 400,
            Self::MissingField(_) => 400,
            Self::Serialization(_) => 400,
            Self::CacheUnavailable(_) => 503,
            Self::DuplicateEvent(_) => 409,
            Self::SessionNotFound(_) => 404,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::ValidationWithCode { code, .. } => Some(code),
            Self::TransientStore { code, .. } => Some(code),
            Self::Validation(_) | Self::MissingField(_) | Self::Serialization(_) => {
                Some(ValidationErrorCode::InvalidFormat.code())
            }
            Self::CacheUnavailable(_) => Some("CACHE_001"),
            Self::DuplicateEvent(_) => Some("DUP_001"),
            _ => None,
        }
    }

    /// Whether a client should retry the request that produced this error.
    ///
    /// Only storage failures qualify. Validation failures are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore { .. } | Self::Internal(_))
    }

    /// Whether this error is a client-side validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationWithCode { .. }
                | Self::Validation(_)
                | Self::MissingField(_)
                | Self::Serialization(_)
        )
    }
}
