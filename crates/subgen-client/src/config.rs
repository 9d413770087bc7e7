//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use subgen_media::FfmpegConfig;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/upload-video";

/// Configuration for the subtitle client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full URL of the upload endpoint
    pub endpoint: String,
    /// Request timeout, covering upload and transcription
    pub timeout: Duration,
    /// Transcoder settings for local merging
    pub ffmpeg: FfmpegConfig,
    /// Scratch directory for local temporary files
    pub scratch_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(1800), // transcription of long videos is slow
            ffmpeg: FfmpegConfig::default(),
            scratch_dir: std::env::temp_dir().join("subgen-client"),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            endpoint: std::env::var("SUBGEN_ENDPOINT").unwrap_or(defaults.endpoint),
            timeout: std::env::var("SUBGEN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            ffmpeg: FfmpegConfig {
                program: std::env::var("FFMPEG_BIN").unwrap_or(defaults.ffmpeg.program),
                // Unset or 0 means no deadline.
                timeout: std::env::var("MERGE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs),
                ..defaults.ffmpeg
            },
            scratch_dir: std::env::var("SUBGEN_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
        }
    }

    /// Override the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.ffmpeg.video_codec, "libx264");
        assert!(config.ffmpeg.timeout.is_none());
    }

    #[test]
    fn test_with_endpoint() {
        let config = ClientConfig::default().with_endpoint("http://subs.internal/upload-video");
        assert_eq!(config.endpoint, "http://subs.internal/upload-video");
    }
}
