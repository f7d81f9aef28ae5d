//! Deepgram-backed transcription engine.

use async_trait::async_trait;
use tstudio_deepgram::{DeepgramClient, DeepgramError};
use tstudio_models::{JobKind, JobParams};

use super::{cancelled, CancelSignal, EngineAdapter, EngineFailure, EngineOutput, InputMode, ResolvedInput};

/// Transcribes media reachable at a signed URL.
#[derive(Clone)]
pub struct TranscriptionEngine {
    client: DeepgramClient,
}

impl TranscriptionEngine {
    pub fn new(client: DeepgramClient) -> Self {
        Self { client }
    }
}

fn failure_from_deepgram(err: DeepgramError) -> EngineFailure {
    match err {
        DeepgramError::Api { status, body } => {
            EngineFailure::new(format!("Deepgram API Error: HTTP {}", status))
                .with_diagnostics(Some(body).filter(|b| !b.is_empty()))
        }
        DeepgramError::InvalidResponse(message) => {
            EngineFailure::new(format!("Deepgram returned an unusable result: {}", message))
        }
        other => EngineFailure::new(other.to_string()),
    }
}

#[async_trait]
impl EngineAdapter for TranscriptionEngine {
    fn kind(&self) -> JobKind {
        JobKind::Transcription
    }

    fn name(&self) -> &str {
        "deepgram"
    }

    fn input_mode(&self) -> InputMode {
        InputMode::SignedUrl
    }

    async fn invoke(
        &self,
        input: ResolvedInput,
        _params: &JobParams,
        mut cancel: CancelSignal,
    ) -> Result<EngineOutput, EngineFailure> {
        let ResolvedInput::SignedUrl(url) = input else {
            return Err(EngineFailure::new("transcription engine needs a signed URL"));
        };

        tokio::select! {
            result = self.client.transcribe_url(&url) => result
                .map(EngineOutput::Transcript)
                .map_err(failure_from_deepgram),
            _ = cancelled(&mut cancel) => {
                Err(EngineFailure::new("transcription request cancelled"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::watch;
    use tstudio_deepgram::DeepgramConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn engine_for(server: &MockServer) -> TranscriptionEngine {
        let client = DeepgramClient::new(DeepgramConfig::new("key").with_base_url(server.uri())).unwrap();
        TranscriptionEngine::new(client)
    }

    #[tokio::test]
    async fn test_transcribes_signed_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/listen"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": {"channels": [{"alternatives": [{"words": [
                    {"word": "hello", "start": 0.0, "end": 0.5}
                ]}]}]}
            })))
            .mount(&server)
            .await;

        let (_tx, rx) = watch::channel(false);
        let output = engine_for(&server)
            .await
            .invoke(ResolvedInput::SignedUrl("https://signed/x".into()), &JobParams::None, rx)
            .await
            .unwrap();
        match output {
            EngineOutput::Transcript(t) => assert_eq!(t.len(), 1),
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_api_error_becomes_failure_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/listen"))
            .respond_with(ResponseTemplate::new(400).set_body_string("{\"err_msg\":\"bad url\"}"))
            .mount(&server)
            .await;

        let (_tx, rx) = watch::channel(false);
        let failure = engine_for(&server)
            .await
            .invoke(ResolvedInput::SignedUrl("https://signed/x".into()), &JobParams::None, rx)
            .await
            .unwrap_err();
        assert_eq!(failure.message, "Deepgram API Error: HTTP 400");
        assert!(failure.diagnostics.unwrap().contains("bad url"));
    }
}
