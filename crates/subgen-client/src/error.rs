//! Client error types.

use thiserror::Error;

use subgen_media::MediaError;

pub type ClientResult<T> = Result<T, ClientError>;

/// Message used when the server gives no `detail`.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The upload could not be sent or the server answered with a non-200
    /// status. `status` is `None` when no response was received.
    #[error("{}", transport_message(.status, .message))]
    Transport { status: Option<u16>, message: String },

    #[error("{0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cancelled")]
    Cancelled,
}

fn transport_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("Error {status}: {message}"),
        None => format!("Request failed: {message}"),
    }
}

impl ClientError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Process exit code for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Transport { .. } => 3,
            Self::Media(_) | Self::Io(_) => 4,
            Self::Cancelled => 130,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_includes_status_and_detail() {
        let err = ClientError::Transport {
            status: Some(400),
            message: "Invalid file type. Please upload a video file.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Error 400: Invalid file type. Please upload a video file."
        );
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_transport_without_response() {
        let err = ClientError::Transport {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed: connection refused");
    }
}
