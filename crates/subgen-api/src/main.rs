//! Axum API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};

use subgen_api::logging::init_tracing;
use subgen_api::{create_router, metrics, ApiConfig, AppState, LogConfig};
use subgen_media::check_tool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing(&LogConfig::from_env()).context("Failed to initialize tracing")?;

    info!("Starting subgen-api");

    let config = ApiConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        work_dir = %config.work_dir.display(),
        model = %config.whisper.model,
        "API config loaded"
    );

    match check_tool(&config.whisper.program) {
        Ok(path) => info!(path = %path.display(), "Transcription engine found"),
        Err(e) => warn!(error = %e, "Transcription engine unavailable, uploads will fail"),
    }

    let state = AppState::new(config.clone())
        .await
        .context("Failed to create application state")?;

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        let handle = metrics::init_metrics()
            .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {e}"))?;
        Some(handle)
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
