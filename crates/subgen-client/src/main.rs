//! Command-line client: upload a video, save its subtitles, optionally burn them in.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use subgen_client::{ClientConfig, ClientOrchestrator};

#[derive(Debug, Parser)]
#[command(name = "subgen", version, about = "Generate subtitles for a video")]
struct Cli {
    /// Video file to subtitle
    video: PathBuf,

    /// Also burn the subtitles into a copy of the video
    #[arg(long)]
    merge: bool,

    /// Directory for the subtitles and merged video
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Upload endpoint, e.g. http://localhost:8000/upload-video
    #[arg(long, env = "SUBGEN_ENDPOINT")]
    endpoint: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,subgen_client=info,subgen_media=info"));

    let result = if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(false))
            .with(env_filter)
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("warning: failed to initialize logging: {e}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let json_logs = cli.json_logs
        || std::env::var("LOG_FORMAT")
            .map(|v| v.to_lowercase() == "json")
            .unwrap_or(false);
    init_tracing(json_logs);

    let mut config = ClientConfig::from_env();
    if let Some(endpoint) = cli.endpoint {
        config = config.with_endpoint(endpoint);
    }

    let orchestrator = match ClientOrchestrator::new(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    // Ctrl-C cancels the upload or merge in flight; scratch files are still released.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            let _ = cancel_tx.send(true);
        }
    });
    let orchestrator = orchestrator.with_cancel(cancel_rx);

    info!(video = %cli.video.display(), endpoint = %config.endpoint, "Starting");

    match orchestrator.run(&cli.video, &cli.output_dir, cli.merge).await {
        Ok(outcome) => {
            println!(
                "Subtitles: {} ({} cues)",
                outcome.subtitle_path.display(),
                outcome.cue_count
            );
            if let Some(merged) = outcome.merged_path {
                println!("Merged video: {}", merged.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
