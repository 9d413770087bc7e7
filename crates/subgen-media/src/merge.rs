//! Hard-subtitle burn-in with FFmpeg.

use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::artifact::{remove_artifact_path, SubtitleArtifact, VideoArtifact};
use crate::command::{FfmpegCommand, ToolCommand, ToolRunner};
use crate::error::{MediaError, MediaResult};

/// Transcoder settings.
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    /// Binary name or path
    pub program: String,
    pub video_codec: String,
    pub audio_codec: String,
    /// Deadline for a single run; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            timeout: None,
        }
    }
}

/// Build the `subtitles` filter for an SRT path.
///
/// ffmpeg unescapes the value twice: once when splitting the filtergraph
/// and once when parsing the filter's options, so the path is escaped for
/// the option level first and the filtergraph level second.
pub fn subtitles_filter(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    let option = escape_with(&path, &['\\', '\'', ':']);
    let graph = escape_with(&option, &['\\', '\'', ',', ';', '[', ']']);
    format!("subtitles={}", graph)
}

fn escape_with(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Burns subtitle cues into the picture track of a video.
#[derive(Debug, Clone)]
pub struct VideoMerger {
    config: FfmpegConfig,
}

impl VideoMerger {
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FfmpegConfig {
        &self.config
    }

    /// Build the transcoder invocation.
    pub fn build_command(&self, video: &Path, subtitles: &Path, output: &Path) -> ToolCommand {
        FfmpegCommand::new(video, output)
            .video_filter(subtitles_filter(subtitles))
            .video_codec(&self.config.video_codec)
            .audio_codec(&self.config.audio_codec)
            .strict_experimental()
            .into_tool_command(&self.config.program)
    }

    /// Merge `subtitles` into `video`, writing the result to `output`.
    ///
    /// The returned artifact owns `output`.
    pub async fn merge(
        &self,
        video: &VideoArtifact,
        subtitles: &SubtitleArtifact,
        output: impl AsRef<Path>,
    ) -> MediaResult<VideoArtifact> {
        self.run(video, subtitles, output.as_ref(), self.runner()).await
    }

    /// Merge, aborting when `cancel_rx` turns `true`.
    pub async fn merge_with_cancel(
        &self,
        video: &VideoArtifact,
        subtitles: &SubtitleArtifact,
        output: impl AsRef<Path>,
        cancel_rx: watch::Receiver<bool>,
    ) -> MediaResult<VideoArtifact> {
        let runner = self.runner().with_cancel(cancel_rx);
        self.run(video, subtitles, output.as_ref(), runner).await
    }

    fn runner(&self) -> ToolRunner {
        ToolRunner::new().with_timeout(self.config.timeout)
    }

    async fn run(
        &self,
        video: &VideoArtifact,
        subtitles: &SubtitleArtifact,
        output: &Path,
        runner: ToolRunner,
    ) -> MediaResult<VideoArtifact> {
        let cmd = self.build_command(video.path(), subtitles.path(), output);

        info!(
            video = %video.path().display(),
            subtitles = %subtitles.path().display(),
            output = %output.display(),
            "Merging subtitles into video"
        );

        let mut progress = MergeProgress::default();
        let result = runner
            .run_with_stderr(&cmd, move |line| {
                if progress.observe(line) {
                    debug!(
                        out_time_ms = progress.out_time_ms,
                        speed = progress.speed,
                        complete = progress.is_complete,
                        "Merge progress"
                    );
                }
            })
            .await;

        let output_run = match result {
            Ok(output_run) => output_run,
            Err(e) => {
                error!(error = %e, "Error merging video and subtitles");
                let _ = remove_artifact_path(output).await;
                return Err(MediaError::merge_tool("transcoder failed", e));
            }
        };

        let merged = VideoArtifact::adopt(output);
        if !merged.is_present().await {
            error!(path = %output.display(), "Merged video missing or empty");
            // Dropping `merged` removes any zero-byte leftover.
            return Err(MediaError::merge_failed(format!(
                "merged video missing or empty: {}",
                output.display()
            )));
        }

        info!(
            path = %output.display(),
            duration_ms = output_run.elapsed.as_millis() as u64,
            "Video merged"
        );
        Ok(merged)
    }
}

/// Latest values from FFmpeg's `-progress` stream.
#[derive(Debug, Clone, Default)]
struct MergeProgress {
    out_time_ms: i64,
    speed: f64,
    is_complete: bool,
}

impl MergeProgress {
    /// Fold one `key=value` line in. Returns `true` at the end of a block.
    fn observe(&mut self, line: &str) -> bool {
        let Some((key, value)) = line.trim().split_once('=') else {
            return false;
        };

        match key {
            "out_time_us" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_ms = us / 1000;
                }
            }
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.speed = speed;
                }
            }
            "progress" => {
                self.is_complete = value == "end";
                return true;
            }
            _ => {}
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactStore;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_subtitles_filter_escapes_special_characters() {
        assert_eq!(
            subtitles_filter(Path::new("/tmp/work/a.srt")),
            "subtitles=/tmp/work/a.srt"
        );
        assert_eq!(
            subtitles_filter(Path::new("/tmp/it's:here.srt")),
            r"subtitles=/tmp/it\\\'s\\:here.srt"
        );
    }

    #[test]
    fn test_subtitles_filter_survives_both_unescape_levels() {
        assert_eq!(
            subtitles_filter(Path::new(r"C:\work\clip.srt")),
            r"subtitles=C\\:/work/clip.srt"
        );
        assert_eq!(
            subtitles_filter(Path::new("/tmp/a,b[1];c.srt")),
            r"subtitles=/tmp/a\,b\[1\]\;c.srt"
        );
    }

    #[test]
    fn test_command_shape() {
        let merger = VideoMerger::new(FfmpegConfig::default());
        let cmd = merger.build_command(
            Path::new("/w/in.mp4"),
            Path::new("/w/in.srt"),
            Path::new("/w/out.mp4"),
        );
        let args = cmd.get_args().join(" ");

        assert_eq!(cmd.program(), "ffmpeg");
        assert!(args.contains("-i /w/in.mp4"));
        assert!(args.contains("-vf subtitles=/w/in.srt"));
        assert!(args.contains("-c:v libx264 -c:a aac -strict experimental"));
        assert!(args.ends_with("/w/out.mp4"));
    }

    #[test]
    fn test_progress_observe() {
        let mut progress = MergeProgress::default();
        assert!(!progress.observe("out_time_us=5000000"));
        assert!(!progress.observe("speed=1.5x"));
        assert!(!progress.observe("speed=N/A"));
        assert!(progress.observe("progress=continue"));
        assert_eq!(progress.out_time_ms, 5000);
        assert!((progress.speed - 1.5).abs() < 0.01);
        assert!(!progress.is_complete);
        assert!(progress.observe("progress=end"));
        assert!(progress.is_complete);
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ffmpeg.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    #[cfg(unix)]
    async fn inputs(store: &ArtifactStore) -> (VideoArtifact, SubtitleArtifact) {
        let video = store.persist(b"fake video", "mp4").await.unwrap();
        let subtitles = store
            .persist_subtitle(b"1\n00:00:00,000 --> 00:00:01,000\nHi\n")
            .await
            .unwrap();
        (video, subtitles)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_merge_produces_output() {
        let tools = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = ArtifactStore::new(work.path());
        let (video, subtitles) = inputs(&store).await;
        let output: PathBuf = work.path().join("merged.mp4");

        // Copy the input to the last argument, as a stand-in for encoding.
        let script = r#"for last; do :; done
echo "progress=end" >&2
printf 'merged' > "$last""#;
        let merger = VideoMerger::new(FfmpegConfig {
            program: fake_ffmpeg(tools.path(), script),
            ..Default::default()
        });

        let merged = merger.merge(&video, &subtitles, &output).await.unwrap();
        assert_eq!(merged.path(), output);
        assert!(merged.size().await.unwrap() > 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_transcoder_is_merge_error() {
        let tools = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = ArtifactStore::new(work.path());
        let (video, subtitles) = inputs(&store).await;
        let output = work.path().join("merged.mp4");

        // Leaves a partial file before failing.
        let script = r#"for last; do :; done
printf 'part' > "$last"
echo "Error initializing filter 'subtitles'" >&2
exit 1"#;
        let merger = VideoMerger::new(FfmpegConfig {
            program: fake_ffmpeg(tools.path(), script),
            ..Default::default()
        });

        let err = merger.merge(&video, &subtitles, &output).await.unwrap_err();
        assert!(err.is_merge());
        assert!(err.to_string().contains("transcoder failed"));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_byte_output_is_merge_error() {
        let tools = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = ArtifactStore::new(work.path());
        let (video, subtitles) = inputs(&store).await;
        let output = work.path().join("merged.mp4");

        let script = r#"for last; do :; done
: > "$last""#;
        let merger = VideoMerger::new(FfmpegConfig {
            program: fake_ffmpeg(tools.path(), script),
            ..Default::default()
        });

        let err = merger.merge(&video, &subtitles, &output).await.unwrap_err();
        assert!(err.is_merge());
        assert!(err.tool_error().is_none());
        assert!(!output.exists());
    }
}
