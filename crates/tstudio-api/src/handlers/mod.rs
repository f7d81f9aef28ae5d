//! Request handlers.

pub mod health;
pub mod jobs;

pub use health::health;
pub use jobs::{clip, transcribe};
