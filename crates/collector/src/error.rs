//! Delivery errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The API answered with a non-success status.
    #[error("server responded with status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to encode payload: {0}")]
    Encode(String),

    #[error("invalid transport configuration: {0}")]
    Config(String),
}

impl DeliveryError {
    /// 5xx and network failures may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status(code) => *code >= 500,
            Self::Network(_) => true,
            Self::Encode(_) | Self::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Network(e.to_string()),
        }
    }
}
