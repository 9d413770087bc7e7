//! End-to-end client flow: upload, save subtitles, optionally burn them in.

use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tracing::{info, warn};

use subgen_media::{
    move_file, Artifact, ArtifactKind, ArtifactStore, SubtitleArtifact, Video, VideoArtifact,
    VideoMerger,
};
use subgen_models::parse_srt;

use crate::client::IngestionClient;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Files produced by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOutcome {
    /// Subtitles written to the output directory
    pub subtitle_path: PathBuf,
    /// Number of cues in the subtitles, 0 if they could not be parsed
    pub cue_count: usize,
    /// Video with burned-in subtitles, when merging was requested
    pub merged_path: Option<PathBuf>,
}

/// Drives one video through upload and optional local merge.
///
/// Steps run strictly in sequence. Scratch copies live in their own
/// [`ArtifactStore`] and are released before [`run`](Self::run) returns.
pub struct ClientOrchestrator {
    client: IngestionClient,
    merger: VideoMerger,
    store: ArtifactStore,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl ClientOrchestrator {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self {
            client: IngestionClient::new(config)?,
            merger: VideoMerger::new(config.ffmpeg.clone()),
            store: ArtifactStore::new(&config.scratch_dir).with_prefix("client-"),
            cancel_rx: None,
        })
    }

    /// Abort a running upload or merge once the value becomes `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Subtitle `video`, writing results into `output_dir`.
    pub async fn run(
        &self,
        video: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        merge: bool,
    ) -> ClientResult<ClientOutcome> {
        let source = video.as_ref();
        let output_dir = output_dir.as_ref();

        self.store.ensure_root().await?;
        tokio::fs::create_dir_all(output_dir).await?;

        let local = self.store.persist_copy(source).await?;
        let result = self.process(source, &local, output_dir, merge).await;
        self.release(local).await;

        result
    }

    async fn process(
        &self,
        source: &Path,
        local: &VideoArtifact,
        output_dir: &Path,
        merge: bool,
    ) -> ClientResult<ClientOutcome> {
        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4");
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("video");

        let bytes = self.upload(local.path(), filename).await?;
        let cue_count = count_cues(&bytes);

        let subtitle_path = output_dir.join(format!("{stem}.srt"));
        tokio::fs::write(&subtitle_path, &bytes).await?;
        info!(path = %subtitle_path.display(), cues = cue_count, "Subtitles saved");

        let merged_path = if merge {
            let subtitles = self.store.persist_subtitle(&bytes).await?;
            let merged = self.merge(source, local, &subtitles, output_dir, stem).await;
            self.release(subtitles).await;
            Some(merged?)
        } else {
            None
        };

        Ok(ClientOutcome {
            subtitle_path,
            cue_count,
            merged_path,
        })
    }

    async fn upload(&self, video: &Path, filename: &str) -> ClientResult<Vec<u8>> {
        let upload = self.client.upload(video, filename);
        let Some(mut cancel_rx) = self.cancel_rx.clone() else {
            return upload.await;
        };

        tokio::select! {
            result = upload => result,
            _ = cancelled(&mut cancel_rx) => {
                info!("Upload cancelled");
                Err(ClientError::Cancelled)
            }
        }
    }

    async fn merge(
        &self,
        source: &Path,
        local: &VideoArtifact,
        subtitles: &SubtitleArtifact,
        output_dir: &Path,
        stem: &str,
    ) -> ClientResult<PathBuf> {
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");

        // The merger owns the target from here and removes it on failure.
        let target = self.store.allocate::<Video>(extension).await?.keep();
        let merged = match &self.cancel_rx {
            Some(rx) => {
                self.merger
                    .merge_with_cancel(local, subtitles, &target, rx.clone())
                    .await?
            }
            None => self.merger.merge(local, subtitles, &target).await?,
        };

        let destination = output_dir.join(format!("{stem}.subtitled.{extension}"));
        move_file(merged.path(), &destination).await?;
        merged.keep();

        info!(path = %destination.display(), "Merged video saved");
        Ok(destination)
    }

    async fn release<K: ArtifactKind>(&self, artifact: Artifact<K>) {
        let path = artifact.path().to_path_buf();
        if let Err(e) = self.store.release(artifact).await {
            warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
        }
    }
}

/// Resolves once the signal turns `true`. A dropped sender never cancels.
async fn cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    if cancel_rx.wait_for(|cancel| *cancel).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn count_cues(bytes: &[u8]) -> usize {
    match parse_srt(&String::from_utf8_lossy(bytes)) {
        Ok(cues) => cues.len(),
        Err(e) => {
            warn!(error = %e, "Received subtitles could not be parsed");
            0
        }
    }
}
