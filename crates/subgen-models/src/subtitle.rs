//! SRT subtitle cues.
//!
//! An SRT file is a sequence of blank-line separated cues:
//!
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:03,500
//! First line
//! Second line
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing SRT content.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubtitleError {
    #[error("Invalid SRT timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid cue index on line {line}: {value}")]
    InvalidIndex { line: usize, value: String },

    #[error("Missing timing line for cue {index}")]
    MissingTiming { index: u32 },

    #[error("Cue {index} ends before it starts")]
    InvertedTiming { index: u32 },
}

/// Cue timestamp with millisecond precision (`HH:MM:SS,mmm`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SrtTimestamp(u64);

impl SrtTimestamp {
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SrtTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0 % 1000;
        let total_secs = self.0 / 1000;
        let secs = total_secs % 60;
        let mins = (total_secs / 60) % 60;
        let hours = total_secs / 3600;
        write!(f, "{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
    }
}

impl FromStr for SrtTimestamp {
    type Err = SubtitleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SubtitleError::InvalidTimestamp(s.to_string());
        let trimmed = s.trim();

        // Some engines emit '.' instead of ',' before the milliseconds.
        let (clock, millis) = trimmed
            .split_once(',')
            .or_else(|| trimmed.split_once('.'))
            .ok_or_else(invalid)?;

        let parts: Vec<&str> = clock.split(':').collect();
        if parts.len() != 3 || millis.len() != 3 {
            return Err(invalid());
        }

        let hours: u64 = parts[0].parse().map_err(|_| invalid())?;
        let mins: u64 = parts[1].parse().map_err(|_| invalid())?;
        let secs: u64 = parts[2].parse().map_err(|_| invalid())?;
        let ms: u64 = millis.parse().map_err(|_| invalid())?;
        if mins >= 60 || secs >= 60 {
            return Err(invalid());
        }

        hours
            .checked_mul(3600)
            .and_then(|total| total.checked_add(mins * 60 + secs))
            .and_then(|total| total.checked_mul(1000))
            .and_then(|total| total.checked_add(ms))
            .map(Self)
            .ok_or_else(invalid)
    }
}

/// One timestamped subtitle entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleCue {
    pub index: u32,
    pub start: SrtTimestamp,
    pub end: SrtTimestamp,
    pub text: String,
}

impl fmt::Display for SubtitleCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", self.start, self.end)?;
        writeln!(f, "{}", self.text)
    }
}

/// Parse SRT content into cues.
///
/// Tolerates a UTF-8 BOM, CRLF line endings and extra blank lines between cues.
pub fn parse_srt(content: &str) -> Result<Vec<SubtitleCue>, SubtitleError> {
    let content = content.trim_start_matches('\u{feff}');
    let mut cues = Vec::new();
    let mut lines = content.lines().map(|l| l.trim_end_matches('\r')).enumerate().peekable();

    loop {
        // Skip separators
        while lines.peek().is_some_and(|(_, l)| l.trim().is_empty()) {
            lines.next();
        }

        let Some((line_no, index_line)) = lines.next() else {
            break;
        };

        let index: u32 = index_line.trim().parse().map_err(|_| SubtitleError::InvalidIndex {
            line: line_no + 1,
            value: index_line.to_string(),
        })?;

        let (_, timing) = lines
            .next()
            .ok_or(SubtitleError::MissingTiming { index })?;
        let (start, end) = timing
            .split_once("-->")
            .ok_or(SubtitleError::MissingTiming { index })?;
        let start: SrtTimestamp = start.parse()?;
        // Positioning hints may follow the end timestamp.
        let end: SrtTimestamp = end
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .parse()?;
        if end < start {
            return Err(SubtitleError::InvertedTiming { index });
        }

        let mut text_lines = Vec::new();
        while let Some((_, line)) = lines.next_if(|(_, l)| !l.trim().is_empty()) {
            text_lines.push(line);
        }

        cues.push(SubtitleCue {
            index,
            start,
            end,
            text: text_lines.join("\n"),
        });
    }

    Ok(cues)
}

/// Render cues back into SRT content.
pub fn format_srt(cues: &[SubtitleCue]) -> String {
    cues.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:00,000 --> 00:00:02,500\nHello there.\n\n2\n00:00:02,500 --> 00:01:05,040\nGeneral Kenobi.\nYou are a bold one.\n";

    #[test]
    fn test_timestamp_parse_and_format() {
        let ts: SrtTimestamp = "01:02:03,456".parse().unwrap();
        assert_eq!(ts.as_millis(), 3_723_456);
        assert_eq!(ts.to_string(), "01:02:03,456");
        assert_eq!("00:00:01.250".parse::<SrtTimestamp>().unwrap().as_millis(), 1250);
    }

    #[test]
    fn test_timestamp_rejects_malformed() {
        assert!("00:00:01".parse::<SrtTimestamp>().is_err());
        assert!("00:61:00,000".parse::<SrtTimestamp>().is_err());
        assert!("aa:00:00,000".parse::<SrtTimestamp>().is_err());
        assert!("00:00:00,12".parse::<SrtTimestamp>().is_err());
    }

    #[test]
    fn test_timestamp_rejects_overflowing_hours() {
        assert!(matches!(
            "9999999999999999:00:00,000".parse::<SrtTimestamp>(),
            Err(SubtitleError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            parse_srt("1\n9999999999999999:00:00,000 --> 9999999999999999:00:01,000\nx\n"),
            Err(SubtitleError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_parse_multiline_cues() {
        let cues = parse_srt(SAMPLE).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].text, "Hello there.");
        assert_eq!(cues[1].end.as_millis(), 65_040);
        assert_eq!(cues[1].text, "General Kenobi.\nYou are a bold one.");
    }

    #[test]
    fn test_parse_crlf_and_bom() {
        let content = "\u{feff}1\r\n00:00:00,000 --> 00:00:01,000\r\nHi\r\n\r\n\r\n";
        let cues = parse_srt(content).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Hi");
    }

    #[test]
    fn test_parse_empty_content() {
        assert!(parse_srt("").unwrap().is_empty());
        assert!(parse_srt("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_srt("one\n00:00:00,000 --> 00:00:01,000\nx\n"),
            Err(SubtitleError::InvalidIndex { line: 1, .. })
        ));
        assert_eq!(parse_srt("3\n"), Err(SubtitleError::MissingTiming { index: 3 }));
        assert_eq!(
            parse_srt("1\n00:00:02,000 --> 00:00:01,000\nx\n"),
            Err(SubtitleError::InvertedTiming { index: 1 })
        );
    }

    #[test]
    fn test_format_matches_input() {
        let cues = parse_srt(SAMPLE).unwrap();
        assert_eq!(format_srt(&cues), SAMPLE);
    }
}
