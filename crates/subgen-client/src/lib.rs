//! Client for the subtitle API.
//!
//! Uploads a local video, stores the returned subtitles next to it and can
//! burn them into a copy of the video with FFmpeg.

pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;

pub use client::IngestionClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use orchestrator::{ClientOrchestrator, ClientOutcome};
