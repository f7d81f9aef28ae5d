//! Health check handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tstudio_models::JobKind;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    /// Job kinds this instance accepts
    pub kinds: Vec<&'static str>,
}

/// Health check endpoint (liveness check).
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let kinds = [JobKind::Transcription, JobKind::Clip]
        .into_iter()
        .filter(|k| state.serves(*k))
        .map(|k| k.as_str())
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        kinds,
    })
}
