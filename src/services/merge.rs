use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use std::path::Path;
use tokio::process::Command;

use crate::errors::{DubError, DubResult};
use crate::services::last_stderr_line;

/// Mux the dubbed audio over the original video stream.
///
/// The video stream is copied without re-encoding; the audio is encoded to
/// AAC. `-shortest` trims trailing excess on either side, but a gross
/// duration mismatch is refused up front rather than silently truncated.
pub async fn merge_video_audio(
    video: &Path,
    audio: &Path,
    dest: &Path,
    duration_tolerance: f64,
) -> DubResult<()> {
    let ffmpeg = which::which("ffmpeg")
        .map_err(|_| DubError::MergeFailed("ffmpeg is not installed or not in PATH".to_string()))?;

    for (path, description) in [(video, "video"), (audio, "dubbed audio")] {
        if !path.is_file() {
            return Err(DubError::MergeFailed(format!(
                "{description} input not found: {}",
                path.display()
            )));
        }
    }

    info!(
        "Merging video and audio: {} + {}",
        video.display(),
        audio.display()
    );

    match (probe_duration(video).await, probe_duration(audio).await) {
        (Ok(video_secs), Ok(audio_secs)) => {
            debug!("durations: video {video_secs:.1}s, dubbed audio {audio_secs:.1}s");
            if !within_tolerance(video_secs, audio_secs, duration_tolerance) {
                return Err(DubError::MergeFailed(format!(
                    "dubbed audio duration {audio_secs:.1}s deviates from video duration \
                     {video_secs:.1}s beyond tolerance"
                )));
            }
        }
        _ => warn!("could not probe input durations, skipping tolerance check"),
    }

    let output = Command::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(video)
        .arg("-i")
        .arg(audio)
        .args([
            "-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac", "-b:a", "192k",
            "-shortest", "-f", "mp4",
        ])
        .arg(dest)
        .output()
        .await
        .map_err(|e| DubError::MergeFailed(format!("failed to launch ffmpeg: {e}")))?;

    if !output.status.success() {
        return Err(DubError::MergeFailed(last_stderr_line(&output.stderr)));
    }
    Ok(())
}

/// True when the dubbed audio length is acceptably close to the video
/// length. The absolute slack covers very short clips where a relative
/// bound alone would be meaningless.
pub(crate) fn within_tolerance(video_secs: f64, audio_secs: f64, tolerance: f64) -> bool {
    let allowed = video_secs * tolerance + 5.0;
    (audio_secs - video_secs).abs() <= allowed
}

/// Media duration in seconds via ffprobe.
pub(crate) async fn probe_duration(path: &Path) -> Result<f64> {
    let ffprobe = which::which("ffprobe").map_err(|_| anyhow!("ffprobe not found"))?;
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(anyhow!(
            "failed to get media duration: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = duration_str
        .parse::<f64>()
        .map_err(|e| anyhow!("failed to parse media duration: {e}"))?;
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_tolerance() {
        assert!(within_tolerance(100.0, 100.0, 0.5));
        assert!(within_tolerance(100.0, 140.0, 0.5));
        assert!(within_tolerance(2.0, 6.0, 0.5)); // absolute slack for short clips
        assert!(!within_tolerance(100.0, 180.0, 0.5));
        assert!(!within_tolerance(100.0, 20.0, 0.5));
    }

    #[tokio::test]
    async fn test_missing_inputs_are_merge_failed() {
        let dir = tempfile::tempdir().unwrap();
        let err = merge_video_audio(
            &dir.path().join("v.mp4"),
            &dir.path().join("a.wav"),
            &dir.path().join("out.mp4"),
            0.5,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DubError::MergeFailed(_)));
    }
}
