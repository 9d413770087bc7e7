//! Shared data models for the subtitle generator.
//!
//! This crate provides:
//! - Supported video formats and upload classification
//! - SRT subtitle cues and timestamps
//! - JSON bodies exchanged with the ingestion API

pub mod api;
pub mod subtitle;
pub mod video_type;

// Re-export common types
pub use api::{ErrorDetail, HealthResponse, WelcomeMessage};
pub use subtitle::{format_srt, parse_srt, SrtTimestamp, SubtitleCue, SubtitleError};
pub use video_type::{classify, is_valid, VideoFormat};
