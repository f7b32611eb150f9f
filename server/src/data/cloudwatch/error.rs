//! CloudWatch client error types

use thiserror::Error;

/// Errors from a single upstream CloudWatch call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudWatchError {
    /// The SDK call failed (transport, throttling, auth, service error)
    #[error("CloudWatch {operation} failed: {message}")]
    Sdk {
        operation: &'static str,
        message: String,
    },

    /// The backend rejected the request (empty query list, unknown page token)
    #[error("Invalid CloudWatch request: {0}")]
    InvalidRequest(String),
}

impl CloudWatchError {
    pub fn sdk(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Sdk {
            operation,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}
