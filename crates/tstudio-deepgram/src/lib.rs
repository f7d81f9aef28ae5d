//! Client for the Deepgram pre-recorded transcription API.
//!
//! This crate provides a client that asks Deepgram to transcribe media
//! reachable at a URL and converts the response into a timed-word
//! [`Transcript`](tstudio_models::Transcript).

pub mod client;
pub mod error;
pub mod types;

pub use client::{DeepgramClient, DeepgramConfig};
pub use error::{DeepgramError, DeepgramResult};
pub use types::{ListenOptions, ListenResponse};
