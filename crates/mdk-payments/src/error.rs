//! Payment Error Types

use thiserror::Error;

use mdk_core::CoreError;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-relay errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Webhook secret missing from server configuration
    #[error("Webhook secret not configured")]
    SecretNotConfigured,

    /// Webhook secret header missing or mismatched
    #[error("Unauthorized webhook request")]
    Unauthorized,

    /// Notification body could not be interpreted
    #[error("Malformed notification: {0}")]
    MalformedNotification(String),

    /// Node or store failure during confirmation
    #[error("Backend error: {0}")]
    Backend(#[from] CoreError),

    /// Upstream API transport failure
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Upstream API rejected the request
    #[error("Upstream returned {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    /// Customer lookup found no match
    #[error("Customer not found")]
    CustomerNotFound,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::Upstream(_) => true,
            PaymentError::Backend(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            PaymentError::SecretNotConfigured => "Webhook secret not configured",
            PaymentError::Unauthorized => "Unauthorized",
            PaymentError::CustomerNotFound => "Customer not found",
            PaymentError::Upstream(_) | PaymentError::UpstreamStatus { .. } => {
                "The payment service is unavailable. Please try again."
            }
            _ => "Internal server error",
        }
    }
}
