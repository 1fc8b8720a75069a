use log::{debug, info};
use std::path::Path;
use tokio::process::Command;

use crate::errors::{DubError, DubResult};
use crate::services::last_stderr_line;

/// Extract the audio track as 16 kHz mono PCM, the format the transcriber
/// expects.
pub async fn extract_audio(video: &Path, dest: &Path) -> DubResult<()> {
    let ffmpeg = which::which("ffmpeg").map_err(|_| {
        DubError::ExtractionFailed("ffmpeg is not installed or not in PATH".to_string())
    })?;

    info!("Extracting audio from video: {}", video.display());

    let output = Command::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(video)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1", "-f", "wav"])
        .arg(dest)
        .output()
        .await
        .map_err(|e| DubError::ExtractionFailed(format!("failed to launch ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        // ffmpeg reports a video-only container this way
        if stderr.contains("does not contain any stream") || stderr.contains("Stream map")
        {
            return Err(DubError::ExtractionFailed(
                "container has no audio track".to_string(),
            ));
        }
        return Err(DubError::ExtractionFailed(last_stderr_line(&output.stderr)));
    }

    debug!("Audio extracted to {}", dest.display());
    Ok(())
}
