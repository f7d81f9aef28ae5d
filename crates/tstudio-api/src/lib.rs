//! Axum HTTP endpoints for the job workers.
//!
//! This crate provides:
//! - `POST /transcribe` and `POST /clip`, each running one job through its pipeline
//! - Plain-text 400s for invalid bodies and JSON 500s for failed jobs
//! - Liveness routes and Prometheus metrics
//! - CORS, request ID and request logging middleware

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
