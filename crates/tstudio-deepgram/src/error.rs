//! Deepgram client error types.

use thiserror::Error;

pub type DeepgramResult<T> = Result<T, DeepgramError>;

#[derive(Debug, Error)]
pub enum DeepgramError {
    #[error("Deepgram configuration error: {0}")]
    Config(String),

    #[error("Deepgram API error ({status})")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeepgramError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Response body or other diagnostic text worth surfacing with the error.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}
