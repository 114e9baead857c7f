//! Error Types

use thiserror::Error;

/// Result type alias for core payment operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Node backend failure (connect, sync, or payment query)
    #[error("Node error: {0}")]
    Node(String),

    /// Payment-state store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Payment hash failed validation
    #[error("Invalid payment hash: {0}")]
    InvalidPaymentHash(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Node(_))
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::Other(err.to_string())
    }
}
