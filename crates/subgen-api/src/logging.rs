//! Structured logging.
//!
//! [`init_tracing`] installs the global subscriber once per process.
//! [`RequestLogger`] is created per upload and handed to the pipeline so
//! every stage transition carries the same request context.

use tracing::{error, info, warn, Span};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Emit JSON lines instead of ANSI text
    pub json: bool,
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            json: false,
            default_filter: "info,subgen_api=debug,subgen_media=info".to_string(),
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self {
            json: std::env::var("LOG_FORMAT")
                .map(|v| v.to_lowercase() == "json")
                .unwrap_or(false),
            ..Self::default()
        }
    }
}

/// Install the global tracing subscriber.
pub fn init_tracing(config: &LogConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    if config.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()
    }
}

/// Upload pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Persisted,
    Transcribed,
    Responded,
    Rejected,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Persisted => "persisted",
            Stage::Transcribed => "transcribed",
            Stage::Responded => "responded",
            Stage::Rejected => "rejected",
            Stage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request logger for the upload pipeline.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    request_id: String,
    operation: String,
}

impl RequestLogger {
    pub fn new(request_id: impl Into<String>, operation: &str) -> Self {
        Self {
            request_id: request_id.into(),
            operation: operation.to_string(),
        }
    }

    /// Log entry into `stage`.
    pub fn stage(&self, stage: Stage, message: &str) {
        match stage {
            Stage::Rejected => warn!(
                request_id = %self.request_id,
                operation = %self.operation,
                stage = %stage,
                "{}", message
            ),
            Stage::Failed => error!(
                request_id = %self.request_id,
                operation = %self.operation,
                stage = %stage,
                "{}", message
            ),
            _ => info!(
                request_id = %self.request_id,
                operation = %self.operation,
                stage = %stage,
                "{}", message
            ),
        }
    }

    /// Log a non-fatal problem, such as a cleanup failure.
    pub fn warning(&self, message: &str) {
        warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            "{}", message
        );
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span covering the whole request pipeline.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "upload",
            request_id = %self.request_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_logger_creation() {
        let logger = RequestLogger::new("req-123", "upload_video");

        assert_eq!(logger.request_id(), "req-123");
        assert_eq!(logger.operation(), "upload_video");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Received.to_string(), "received");
        assert_eq!(Stage::Transcribed.as_str(), "transcribed");
        assert_eq!(Stage::Failed.as_str(), "failed");
    }

    #[test]
    fn test_log_config_default_filter_parses() {
        let config = LogConfig::default();
        assert!(EnvFilter::try_new(&config.default_filter).is_ok());
    }
}
