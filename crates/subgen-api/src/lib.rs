//! Axum HTTP API server.
//!
//! This crate provides:
//! - `POST /upload-video`: validate, persist, transcribe, respond with SRT bytes
//! - Welcome and liveness endpoints
//! - Request IDs, request logging and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use logging::{LogConfig, RequestLogger};
pub use routes::create_router;
pub use state::AppState;
