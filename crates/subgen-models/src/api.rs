//! JSON bodies exchanged with the ingestion API.

use serde::{Deserialize, Serialize};

/// Detail shown when an upload is not a supported video.
pub const INVALID_FILE_TYPE_DETAIL: &str = "Invalid file type. Please upload a video file.";

/// Detail shown when the transcription engine fails.
pub const GENERATION_FAILED_DETAIL: &str = "Failed to generate subtitles.";

/// Detail shown for any other processing failure.
pub const PROCESSING_FAILED_DETAIL: &str = "An error occurred while processing the video.";

/// Greeting returned by the root endpoint.
pub const WELCOME_MESSAGE: &str = "Welcome to the Video Subtitle Generator API!";

/// Error body: `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Root endpoint body: `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMessage {
    pub message: String,
}

impl Default for WelcomeMessage {
    fn default() -> Self {
        Self {
            message: WELCOME_MESSAGE.to_string(),
        }
    }
}

/// Liveness probe body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
