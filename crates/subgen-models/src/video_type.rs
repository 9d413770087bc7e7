//! Supported video formats and upload classification.
//!
//! The MIME aliases and the extension of each format live on the same enum
//! variant, so adding a format extends both lookup sets at once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Video container formats accepted for transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoFormat {
    Mp4,
    Avi,
    Mov,
    Mkv,
}

impl VideoFormat {
    /// All supported formats.
    pub const ALL: &'static [VideoFormat] = &[
        VideoFormat::Mp4,
        VideoFormat::Avi,
        VideoFormat::Mov,
        VideoFormat::Mkv,
    ];

    /// File extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Avi => "avi",
            VideoFormat::Mov => "mov",
            VideoFormat::Mkv => "mkv",
        }
    }

    /// MIME types that identify this format. The first entry is the one
    /// inferred from the extension.
    pub fn mime_types(&self) -> &'static [&'static str] {
        match self {
            VideoFormat::Mp4 => &["video/mp4"],
            VideoFormat::Avi => &["video/x-msvideo", "video/avi"],
            VideoFormat::Mov => &["video/quicktime", "video/mov"],
            VideoFormat::Mkv => &["video/x-matroska", "video/mkv"],
        }
    }

    /// Look up a format by a declared MIME type.
    ///
    /// Parameters (`; codecs=...`) are ignored and matching is case-insensitive.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next()?.trim().to_ascii_lowercase();
        if essence.is_empty() {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.mime_types().contains(&essence.as_str()))
    }

    /// Look up a format by file extension (with or without leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.extension() == ext)
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Infer a MIME type from a filename's extension.
pub fn guess_mime(filename: &str) -> Option<&'static str> {
    let ext = filename_extension(filename)?;
    VideoFormat::from_extension(&ext).map(|format| format.mime_types()[0])
}

fn filename_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Classify an upload by its declared MIME type and filename.
///
/// Order: declared MIME type, then a MIME type inferred from the extension,
/// then the extension itself. Returns the accepted format, if any.
pub fn classify(declared_mime: Option<&str>, filename: Option<&str>) -> Option<VideoFormat> {
    if let Some(format) = declared_mime.and_then(VideoFormat::from_mime) {
        return Some(format);
    }

    let filename = filename?;

    if let Some(format) = guess_mime(filename).and_then(VideoFormat::from_mime) {
        return Some(format);
    }

    filename_extension(filename).and_then(|ext| VideoFormat::from_extension(&ext))
}

/// Whether an upload is a supported video. Never fails; absent inputs reject.
pub fn is_valid(declared_mime: Option<&str>, filename: Option<&str>) -> bool {
    classify(declared_mime, filename).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_mime_accepts() {
        assert!(is_valid(Some("video/mp4"), Some("clip.mp4")));
        assert!(is_valid(Some("video/quicktime"), None));
        assert!(is_valid(Some("VIDEO/MP4; codecs=avc1"), Some("noext")));
    }

    #[test]
    fn test_extension_fallback_without_mime() {
        assert_eq!(classify(None, Some("clip.mkv")), Some(VideoFormat::Mkv));
        assert_eq!(classify(None, Some("CLIP.MOV")), Some(VideoFormat::Mov));
    }

    #[test]
    fn test_extension_wins_over_unsupported_mime() {
        // Browsers commonly send octet-stream for containers they don't know.
        assert!(is_valid(Some("application/octet-stream"), Some("movie.avi")));
    }

    #[test]
    fn test_rejects_unsupported() {
        assert!(!is_valid(Some("text/plain"), Some("notes.txt")));
        assert!(!is_valid(Some("video/webm"), Some("clip.webm")));
        assert!(!is_valid(None, Some("archive.mp4.zip")));
    }

    #[test]
    fn test_absent_inputs_do_not_panic() {
        assert!(!is_valid(None, None));
        assert!(!is_valid(Some(""), Some("")));
        assert!(!is_valid(None, Some("README")));
        assert!(!is_valid(Some(";"), Some(".")));
        assert!(!is_valid(None, Some(".mp4")));
    }

    #[test]
    fn test_mime_or_extension_membership() {
        let mimes = [
            Some("video/mp4"),
            Some("video/x-matroska"),
            Some("text/plain"),
            Some("image/png"),
            None,
        ];
        let names = [
            Some("a.mp4"),
            Some("a.mkv"),
            Some("a.txt"),
            Some("a"),
            None,
        ];

        for mime in mimes {
            for name in names {
                let mime_ok = mime.and_then(VideoFormat::from_mime).is_some();
                let ext_ok = name
                    .and_then(filename_extension)
                    .and_then(|ext| VideoFormat::from_extension(&ext))
                    .is_some();
                assert_eq!(is_valid(mime, name), mime_ok || ext_ok, "{mime:?} {name:?}");
            }
        }
    }

    #[test]
    fn test_every_format_round_trips_its_tables() {
        for format in VideoFormat::ALL {
            assert_eq!(VideoFormat::from_extension(format.extension()), Some(*format));
            for mime in format.mime_types() {
                assert_eq!(VideoFormat::from_mime(mime), Some(*format));
            }
            let name = format!("x.{}", format.extension());
            assert_eq!(guess_mime(&name), Some(format.mime_types()[0]));
        }
    }
}
