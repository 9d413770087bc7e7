//! Error types for media operations.

use std::time::Duration;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Failures of a single external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{program} not found in PATH")]
    NotFound { program: String },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {exit_code:?}: {stderr}")]
    Exited {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{program} timed out after {} seconds", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} was cancelled")]
    Cancelled { program: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Exit code of the tool, if it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ToolError::Exited { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

/// Errors surfaced by the media components.
///
/// Each component re-raises tool failures as its own kind and keeps the
/// original [`ToolError`] as the source.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Subtitle generation failed: {message}")]
    Generation {
        message: String,
        #[source]
        source: Option<ToolError>,
    },

    #[error("Video merge failed: {message}")]
    Merge {
        message: String,
        #[source]
        source: Option<ToolError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a generation failure without a tool diagnostic.
    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a transcription tool failure.
    pub fn generation_tool(message: impl Into<String>, source: ToolError) -> Self {
        Self::Generation {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a merge failure without a tool diagnostic.
    pub fn merge_failed(message: impl Into<String>) -> Self {
        Self::Merge {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a transcoder failure.
    pub fn merge_tool(message: impl Into<String>, source: ToolError) -> Self {
        Self::Merge {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn is_generation(&self) -> bool {
        matches!(self, MediaError::Generation { .. })
    }

    pub fn is_merge(&self) -> bool {
        matches!(self, MediaError::Merge { .. })
    }

    /// Underlying tool failure, if any.
    pub fn tool_error(&self) -> Option<&ToolError> {
        match self {
            MediaError::Generation { source, .. } | MediaError::Merge { source, .. } => {
                source.as_ref()
            }
            MediaError::Io(_) => None,
        }
    }
}
