//! Client error types.

use thiserror::Error;
use tstudio_firestore::JobStoreError;
use tstudio_models::ModelError;
use tstudio_storage::StorageError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid job parameters: {0}")]
    InvalidParams(String),

    #[error("Upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error("Job store error: {0}")]
    JobStore(#[from] JobStoreError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ClientError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }
}
