//! Subtitle generation with the `whisper` CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

use crate::artifact::{remove_artifact_path, SubtitleArtifact, VideoArtifact};
use crate::command::{ToolCommand, ToolRunner};
use crate::error::{MediaError, MediaResult};

/// Output format requested from the transcription engine.
const OUTPUT_FORMAT: &str = "srt";

/// Transcription engine settings.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Binary name or path
    pub program: String,
    /// Model size selector (tiny, base, small, medium, large)
    pub model: String,
    /// Deadline for a single run; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            program: "whisper".to_string(),
            model: "base".to_string(),
            timeout: None,
        }
    }
}

/// Produces an SRT file next to a video by running the transcription engine.
#[derive(Debug, Clone)]
pub struct SubtitleGenerator {
    config: WhisperConfig,
}

impl SubtitleGenerator {
    pub fn new(config: WhisperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }

    /// Where the engine writes subtitles for `video`: same directory and base
    /// name, `.srt` extension.
    pub fn expected_output(video: &Path) -> PathBuf {
        video.with_extension(OUTPUT_FORMAT)
    }

    /// Build the engine invocation for `video`.
    pub fn build_command(&self, video: &Path) -> ToolCommand {
        ToolCommand::new(&self.config.program)
            .path_arg(video)
            .args(["--model", self.config.model.as_str()])
            .args(["--output_format", OUTPUT_FORMAT])
            .arg("--output_dir")
            .path_arg(output_dir(video))
    }

    /// Generate subtitles for a video.
    pub async fn generate(&self, video: &VideoArtifact) -> MediaResult<SubtitleArtifact> {
        self.run(video, self.runner()).await
    }

    /// Generate subtitles, aborting when `cancel_rx` turns `true`.
    pub async fn generate_with_cancel(
        &self,
        video: &VideoArtifact,
        cancel_rx: watch::Receiver<bool>,
    ) -> MediaResult<SubtitleArtifact> {
        self.run(video, self.runner().with_cancel(cancel_rx)).await
    }

    fn runner(&self) -> ToolRunner {
        ToolRunner::new().with_timeout(self.config.timeout)
    }

    async fn run(&self, video: &VideoArtifact, runner: ToolRunner) -> MediaResult<SubtitleArtifact> {
        let expected = Self::expected_output(video.path());
        let cmd = self.build_command(video.path());

        info!(
            video = %video.path().display(),
            model = %self.config.model,
            "Generating subtitles"
        );

        let output = match runner.run(&cmd).await {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Error generating subtitles");
                // A failed run may still leave a partial file behind.
                let _ = remove_artifact_path(&expected).await;
                return Err(MediaError::generation_tool("transcription engine failed", e));
            }
        };

        // Exit status 0 alone is not trusted: the file must be there.
        match tokio::fs::metadata(&expected).await {
            Ok(meta) if meta.len() > 0 => {}
            Ok(_) => {
                error!(path = %expected.display(), "Subtitles file is empty");
                let _ = remove_artifact_path(&expected).await;
                return Err(MediaError::generation_failed(format!(
                    "subtitles file is empty: {}",
                    expected.display()
                )));
            }
            Err(_) => {
                error!(path = %expected.display(), "Subtitles file not found");
                return Err(MediaError::generation_failed(format!(
                    "subtitles file not found: {}",
                    expected.display()
                )));
            }
        }

        info!(
            path = %expected.display(),
            duration_ms = output.elapsed.as_millis() as u64,
            "Subtitles generated"
        );
        Ok(SubtitleArtifact::adopt(expected))
    }
}

fn output_dir(video: &Path) -> &Path {
    match video.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
