//! Scoped temporary artifacts.
//!
//! Every file the pipeline writes is wrapped in an [`Artifact`]. The artifact
//! owns deletion of its file: [`Artifact::release`] removes it explicitly,
//! dropping an unreleased artifact removes it as a fallback, and
//! [`Artifact::keep`] hands the file (and the duty to delete it) to the caller.

use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Kind marker for artifacts.
pub trait ArtifactKind {
    const LABEL: &'static str;
}

/// Video bytes.
#[derive(Debug)]
pub struct Video;

/// SRT subtitle bytes.
#[derive(Debug)]
pub struct Subtitle;

impl ArtifactKind for Video {
    const LABEL: &'static str = "video";
}

impl ArtifactKind for Subtitle {
    const LABEL: &'static str = "subtitle";
}

/// A file on disk owned by one pipeline stage.
pub struct Artifact<K: ArtifactKind> {
    path: PathBuf,
    armed: bool,
    _kind: PhantomData<fn() -> K>,
}

pub type VideoArtifact = Artifact<Video>;
pub type SubtitleArtifact = Artifact<Subtitle>;

impl<K: ArtifactKind> Artifact<K> {
    /// Take ownership of an existing file.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
            _kind: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without its extension.
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }

    /// Size of the file in bytes.
    pub async fn size(&self) -> io::Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    /// Whether the file exists and holds at least one byte.
    pub async fn is_present(&self) -> bool {
        self.size().await.map(|len| len > 0).unwrap_or(false)
    }

    /// Read the whole file.
    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Hand the file over to the caller, who becomes responsible for deleting it.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Delete the file. Succeeds if it is already gone.
    pub async fn release(mut self) -> io::Result<()> {
        self.armed = false;
        remove_artifact_path(&self.path).await?;
        debug!(kind = K::LABEL, path = %self.path.display(), "Artifact released");
        Ok(())
    }
}

impl<K: ArtifactKind> fmt::Debug for Artifact<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("kind", &K::LABEL)
            .field("path", &self.path)
            .field("armed", &self.armed)
            .finish()
    }
}

impl<K: ArtifactKind> Drop for Artifact<K> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(
                kind = K::LABEL,
                path = %self.path.display(),
                "Artifact removed on drop"
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                kind = K::LABEL,
                path = %self.path.display(),
                error = %e,
                "Failed to remove artifact on drop"
            ),
        }
    }
}

/// Remove a file, treating "already absent" as success.
pub async fn remove_artifact_path(path: impl AsRef<Path>) -> io::Result<()> {
    match tokio::fs::remove_file(path.as_ref()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Allocates uniquely named artifacts under one root directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    prefix: String,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: "subgen-".to_string(),
        }
    }

    /// Store rooted in the system temp directory.
    pub fn temp() -> Self {
        Self::new(std::env::temp_dir().join("subgen"))
    }

    /// Set the file name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if needed.
    pub async fn ensure_root(&self) -> MediaResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Reserve a fresh, empty, uniquely named file.
    pub async fn allocate<K: ArtifactKind>(&self, extension: &str) -> MediaResult<Artifact<K>> {
        let (_, artifact) = self.create(extension).await?;
        Ok(artifact)
    }

    /// Write uploaded video bytes to a new artifact.
    pub async fn persist(&self, bytes: &[u8], extension: &str) -> MediaResult<VideoArtifact> {
        self.write_new(bytes, extension).await
    }

    /// Write subtitle bytes to a new artifact.
    pub async fn persist_subtitle(&self, bytes: &[u8]) -> MediaResult<SubtitleArtifact> {
        self.write_new(bytes, "srt").await
    }

    /// Copy a local video file into the store.
    pub async fn persist_copy(&self, source: impl AsRef<Path>) -> MediaResult<VideoArtifact> {
        let source = source.as_ref();
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp4");

        let (file, artifact) = self.create::<Video>(extension).await?;
        drop(file);
        tokio::fs::copy(source, artifact.path()).await?;

        debug!(
            source = %source.display(),
            path = %artifact.path().display(),
            "Copied video into artifact store"
        );
        Ok(artifact)
    }

    /// Release an artifact created by this store or handed to it.
    pub async fn release<K: ArtifactKind>(&self, artifact: Artifact<K>) -> MediaResult<()> {
        artifact.release().await?;
        Ok(())
    }

    async fn write_new<K: ArtifactKind>(
        &self,
        bytes: &[u8],
        extension: &str,
    ) -> MediaResult<Artifact<K>> {
        let (mut file, artifact) = self.create::<K>(extension).await?;
        // On failure the artifact is dropped and the partial file removed.
        file.write_all(bytes).await?;
        file.flush().await?;

        debug!(
            kind = K::LABEL,
            path = %artifact.path().display(),
            bytes = bytes.len(),
            "Artifact persisted"
        );
        Ok(artifact)
    }

    async fn create<K: ArtifactKind>(
        &self,
        extension: &str,
    ) -> MediaResult<(tokio::fs::File, Artifact<K>)> {
        let suffix = format!(".{}", extension.trim_start_matches('.'));
        let named = tempfile::Builder::new()
            .prefix(&self.prefix)
            .suffix(&suffix)
            .rand_bytes(12)
            .tempfile_in(&self.root)?;
        let (file, path) = named.keep().map_err(|e| e.error)?;

        Ok((tokio::fs::File::from_std(file), Artifact::adopt(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_persist_writes_unique_files() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let a = store.persist(b"first", "mp4").await.unwrap();
        let b = store.persist(b"second", "mp4").await.unwrap();

        assert_ne!(a.path(), b.path());
        assert_eq!(a.path().extension().unwrap(), "mp4");
        assert_eq!(a.read().await.unwrap(), b"first");
        assert_eq!(b.size().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_concurrent_persist_never_collides() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let artifact = store.persist(&[i as u8], "mp4").await.unwrap();
                    artifact.keep()
                })
            })
            .collect();

        let mut paths = std::collections::HashSet::new();
        for handle in handles {
            assert!(paths.insert(handle.await.unwrap()));
        }
        assert_eq!(paths.len(), 32);
    }

    #[tokio::test]
    async fn test_release_deletes_file() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let artifact = store.persist(b"data", "mkv").await.unwrap();
        let path = artifact.path().to_path_buf();
        store.release(artifact).await.unwrap();

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.srt");

        // Never created
        SubtitleArtifact::adopt(&path).release().await.unwrap();

        // Already released
        tokio::fs::write(&path, b"x").await.unwrap();
        SubtitleArtifact::adopt(&path).release().await.unwrap();
        SubtitleArtifact::adopt(&path).release().await.unwrap();
        remove_artifact_path(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_removes_unreleased_artifact() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let path = {
            let artifact = store.persist(b"data", "mp4").await.unwrap();
            artifact.path().to_path_buf()
        };

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_keep_hands_off_file() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let artifact = store.persist(b"data", "mp4").await.unwrap();
        let path = artifact.keep();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_persist_copy_preserves_extension_and_bytes() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("holiday.mov");
        tokio::fs::write(&source, b"moov").await.unwrap();

        let store = ArtifactStore::new(dir.path().join("scratch"));
        store.ensure_root().await.unwrap();
        let artifact = store.persist_copy(&source).await.unwrap();

        assert_eq!(artifact.path().extension().unwrap(), "mov");
        assert_eq!(artifact.read().await.unwrap(), b"moov");
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_allocate_reserves_empty_file() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).with_prefix("merge-");

        let artifact: VideoArtifact = store.allocate("mp4").await.unwrap();
        assert!(artifact.path().exists());
        assert!(!artifact.is_present().await);
        assert!(artifact.stem().unwrap().starts_with("merge-"));
    }
}
