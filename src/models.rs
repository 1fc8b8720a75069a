use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::tts::TtsEngine;

/// Where the source video comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Url(String),
    LocalFile(PathBuf),
}

impl MediaSource {
    pub fn parse(raw: &str) -> MediaSource {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            MediaSource::Url(raw.to_string())
        } else {
            MediaSource::LocalFile(PathBuf::from(raw))
        }
    }
}

/// One dubbing request. Immutable once the pipeline starts.
#[derive(Debug, Clone)]
pub struct Job {
    pub source: MediaSource,
    pub source_language: String,
    pub target_language: String,
    pub engine: TtsEngine,
    pub reference_audio: Option<PathBuf>,
    /// Set when the reference sample should be captured from the microphone.
    pub record_duration_secs: Option<u32>,
    pub work_dir: PathBuf,
}

/// One time-aligned unit of the transcript, in source order.
///
/// Translation preserves the sequence: segment `i` of the translation
/// corresponds to segment `i` of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

static RE_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"((?:\d{2}:)?\d{2}:\d{2}\.\d{3})\s+-->\s+((?:\d{2}:)?\d{2}:\d{2}\.\d{3})")
        .expect("cue timing regex is valid")
});

/// Convert a VTT timestamp (e.g., "00:01:23.456" or "01:23.456") to seconds.
fn parse_timestamp(ts: &str) -> Option<f64> {
    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() == 3 {
        let hours: f64 = parts[0].parse().ok()?;
        let minutes: f64 = parts[1].parse().ok()?;
        let seconds: f64 = parts[2].parse().ok()?;
        Some(hours * 3600.0 + minutes * 60.0 + seconds)
    } else if parts.len() == 2 {
        let minutes: f64 = parts[0].parse().ok()?;
        let seconds: f64 = parts[1].parse().ok()?;
        Some(minutes * 60.0 + seconds)
    } else {
        None
    }
}

/// Format seconds as a VTT timestamp (HH:MM:SS.mmm).
fn format_timestamp(seconds: f64) -> String {
    let hours = (seconds / 3600.0).floor() as u32;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as u32;
    let secs = seconds % 60.0;

    format!("{:02}:{:02}:{:06.3}", hours, minutes, secs)
}

/// Parse WebVTT content into ordered transcript segments.
pub fn parse_vtt(content: &str) -> Result<Vec<TranscriptSegment>> {
    let mut segments = Vec::new();
    let mut current: Option<(f64, f64)> = None;
    let mut text_lines: Vec<String> = Vec::new();

    for line in content.lines() {
        if let Some(caps) = RE_CUE.captures(line) {
            flush(&mut segments, &mut current, &mut text_lines);
            let start = parse_timestamp(&caps[1])
                .ok_or_else(|| anyhow!("invalid start timestamp: {}", &caps[1]))?;
            let end = parse_timestamp(&caps[2])
                .ok_or_else(|| anyhow!("invalid end timestamp: {}", &caps[2]))?;
            current = Some((start, end));
        } else if line.trim().is_empty() {
            flush(&mut segments, &mut current, &mut text_lines);
        } else if current.is_some() {
            text_lines.push(line.trim().to_string());
        }
        // lines before the first cue (the WEBVTT header, cue identifiers) are skipped
    }
    flush(&mut segments, &mut current, &mut text_lines);

    Ok(segments)
}

fn flush(
    segments: &mut Vec<TranscriptSegment>,
    current: &mut Option<(f64, f64)>,
    text_lines: &mut Vec<String>,
) {
    if let Some((start, end)) = current.take() {
        if !text_lines.is_empty() {
            segments.push(TranscriptSegment {
                index: segments.len(),
                start,
                end,
                text: text_lines.join(" "),
            });
        }
    }
    text_lines.clear();
}

/// Render segments back to WebVTT, preserving order and timing.
pub fn format_vtt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in segments {
        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_timestamp(segment.start),
            format_timestamp(segment.end),
            segment.text
        ));
    }
    out
}
