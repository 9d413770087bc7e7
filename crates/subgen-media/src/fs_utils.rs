//! Moving artifacts out of scratch space.
//!
//! Scratch directories often live on a different filesystem (tmpfs) than the
//! destination chosen by the user, so a plain rename can fail with EXDEV.

use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// EXDEV on Linux and macOS.
const EXDEV: i32 = 18;

/// Move `src` to `dst`, copying across filesystems when needed.
///
/// The destination directory is created if missing and an existing
/// destination file is replaced.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());

    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(EXDEV) => {
            debug!(
                src = %src.display(),
                dst = %dst.display(),
                "Cross-device move, copying instead"
            );
            copy_then_remove(src, dst).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn copy_then_remove(src: &Path, dst: &Path) -> MediaResult<()> {
    // Stage next to the destination so the final rename stays on one filesystem.
    let staged = dst.with_extension("partial");

    if let Err(e) = fs::copy(src, &staged).await {
        let _ = fs::remove_file(&staged).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&staged, dst).await {
        let _ = fs::remove_file(&staged).await;
        return Err(e.into());
    }

    if let Err(e) = fs::remove_file(src).await {
        warn!(src = %src.display(), error = %e, "Failed to remove source after copy");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("merged.mp4");
        let dst = dir.path().join("out").join("clip.subtitled.mp4");
        fs::write(&src, b"video").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"video");
    }

    #[tokio::test]
    async fn test_move_replaces_existing_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("new.srt");
        let dst = dir.path().join("old.srt");
        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert_eq!(fs::read(&dst).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_copy_then_remove() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.mp4");
        let dst = dir.path().join("b.mp4");
        fs::write(&src, b"bytes").await.unwrap();

        copy_then_remove(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert!(!dir.path().join("b.partial").exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"bytes");
    }
}
