//! Error types for model parsing and validation.

use thiserror::Error;

use crate::job::JobStatus;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while parsing or validating models.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid artifact URI '{uri}': {reason}")]
    InvalidArtifactUri { uri: String, reason: String },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

impl ModelError {
    /// Create an invalid artifact URI error.
    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArtifactUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}
