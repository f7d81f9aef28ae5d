//! Pipeline error types.

use std::time::Duration;

use thiserror::Error;
use tstudio_firestore::JobStoreError;
use tstudio_models::ModelError;
use tstudio_storage::StorageError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error category, used for metrics labels and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Infra,
    Engine,
    Timeout,
    Publish,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Infra => "infra",
            ErrorKind::Engine => "engine",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Publish => "publish",
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or out-of-range request. Never touches job state.
    #[error("{0}")]
    Validation(String),

    #[error("Job store error: {0}")]
    Store(#[from] JobStoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{}", engine_message(.message, .diagnostics.as_deref()))]
    Engine {
        message: String,
        diagnostics: Option<String>,
    },

    #[error("Engine call exceeded its budget of {}s", .budget.as_secs_f64())]
    Timeout { budget: Duration },

    #[error("Failed to publish output: {0}")]
    Publish(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn engine_message(message: &str, diagnostics: Option<&str>) -> String {
    match diagnostics {
        Some(d) if !d.trim().is_empty() => format!("{}. Details: {}", message, d.trim()),
        _ => message.to_string(),
    }
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn engine(message: impl Into<String>, diagnostics: Option<String>) -> Self {
        Self::Engine {
            message: message.into(),
            diagnostics,
        }
    }

    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::Store(_) | PipelineError::Storage(_) | PipelineError::Io(_) => ErrorKind::Infra,
            PipelineError::Engine { .. } => ErrorKind::Engine,
            PipelineError::Timeout { .. } => ErrorKind::Timeout,
            PipelineError::Publish(_) => ErrorKind::Publish,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        Self::Validation(err.to_string())
    }
}
