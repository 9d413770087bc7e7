//! Welcome and liveness endpoints.

use axum::Json;
use subgen_models::{HealthResponse, WelcomeMessage};

/// Welcome message.
pub async fn root() -> Json<WelcomeMessage> {
    Json(WelcomeMessage::default())
}

/// Liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
