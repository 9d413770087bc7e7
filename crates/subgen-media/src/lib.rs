#![deny(unreachable_patterns)]
//! Whisper and FFmpeg CLI wrappers.
//!
//! This crate provides:
//! - Scoped temporary artifacts that are deleted on every exit path
//! - A subprocess runner with deadlines and cooperative cancellation
//! - Subtitle generation through the `whisper` CLI
//! - Hard-subtitle burn-in through `ffmpeg`

pub mod artifact;
pub mod command;
pub mod error;
pub mod fs_utils;
pub mod merge;
pub mod transcribe;

pub use artifact::{
    remove_artifact_path, Artifact, ArtifactKind, ArtifactStore, Subtitle, SubtitleArtifact,
    Video, VideoArtifact,
};
pub use command::{check_tool, FfmpegCommand, ToolCommand, ToolOutput, ToolRunner};
pub use error::{MediaError, MediaResult, ToolError};
pub use fs_utils::move_file;
pub use merge::{subtitles_filter, FfmpegConfig, VideoMerger};
pub use transcribe::{SubtitleGenerator, WhisperConfig};
