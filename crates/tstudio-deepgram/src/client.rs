//! Deepgram HTTP client.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};
use tstudio_models::Transcript;

use crate::error::{DeepgramError, DeepgramResult};
use crate::types::{ListenOptions, ListenResponse, UrlSource};

/// Configuration for the Deepgram client.
#[derive(Debug, Clone)]
pub struct DeepgramConfig {
    /// API key sent as `Authorization: Token <key>`
    pub api_key: String,
    /// Base URL of the API
    pub base_url: String,
    /// Model used for transcription
    pub model: String,
    /// Request timeout
    pub timeout: Duration,
}

impl DeepgramConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.deepgram.com".to_string(),
            model: "nova-2".to_string(),
            timeout: Duration::from_secs(300),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> DeepgramResult<Self> {
        let api_key = std::env::var("DEEPGRAM_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DeepgramError::config("DEEPGRAM_API_KEY environment variable not set"))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("DEEPGRAM_BASE_URL")
                .unwrap_or_else(|_| "https://api.deepgram.com".to_string()),
            model: std::env::var("DEEPGRAM_MODEL").unwrap_or_else(|_| "nova-2".to_string()),
            timeout: Duration::from_secs(
                std::env::var("DEEPGRAM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Client for Deepgram pre-recorded transcription.
#[derive(Clone)]
pub struct DeepgramClient {
    http: Client,
    config: DeepgramConfig,
}

impl DeepgramClient {
    /// Create a new Deepgram client.
    pub fn new(config: DeepgramConfig) -> DeepgramResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(DeepgramError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> DeepgramResult<Self> {
        Self::new(DeepgramConfig::from_env()?)
    }

    pub fn options(&self) -> ListenOptions {
        ListenOptions::default().with_model(self.config.model.clone())
    }

    /// Transcribe the media at `url`.
    ///
    /// Makes exactly one request; the caller decides whether to try again.
    pub async fn transcribe_url(&self, url: &str) -> DeepgramResult<Transcript> {
        let endpoint = format!("{}/v1/listen", self.config.base_url.trim_end_matches('/'));
        let options = self.options();

        debug!(model = %options.model, "Sending transcription request to {}", endpoint);

        let response = self
            .http
            .post(&endpoint)
            .header("Authorization", format!("Token {}", self.config.api_key))
            .query(&options.to_query())
            .json(&UrlSource { url })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, "Deepgram request failed");
            return Err(DeepgramError::Api { status, body });
        }

        let body: ListenResponse = response.json().await?;
        body.into_transcript()
    }
}
