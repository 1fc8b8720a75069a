use log::{debug, info};
use std::path::Path;
use tokio::process::Command;

use crate::errors::{DubError, DubResult};
use crate::models::MediaSource;
use crate::services::last_stderr_line;

/// Fetch the source video into `dest`.
///
/// A local path is copied as-is; a URL goes through yt-dlp.
pub async fn fetch(source: &MediaSource, dest: &Path) -> DubResult<()> {
    match source {
        MediaSource::LocalFile(path) => {
            info!("Using local video file: {}", path.display());
            if !path.is_file() {
                return Err(DubError::DownloadFailed(format!(
                    "local video not found: {}",
                    path.display()
                )));
            }
            tokio::fs::copy(path, dest).await.map_err(|e| {
                DubError::DownloadFailed(format!("failed to copy local video: {e}"))
            })?;
            Ok(())
        }
        MediaSource::Url(url) => {
            let ytdlp = which::which("yt-dlp").map_err(|_| {
                DubError::DownloadFailed("yt-dlp is not installed or not in PATH".to_string())
            })?;
            info!("Downloading video: {}", url);
            debug!("Using yt-dlp from: {}", ytdlp.display());

            let output = Command::new(ytdlp)
                .args(["-f", "best[height<=720]", "--no-playlist", "-o"])
                .arg(dest)
                .arg(url)
                .output()
                .await
                .map_err(|e| DubError::DownloadFailed(format!("failed to launch yt-dlp: {e}")))?;

            if !output.status.success() {
                return Err(DubError::DownloadFailed(last_stderr_line(&output.stderr)));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_local_file_is_download_failed() {
        let dir = tempfile::tempdir().unwrap();
        let source = MediaSource::LocalFile(dir.path().join("missing.mp4"));
        let err = fetch(&source, &dir.path().join("out.mp4")).await.unwrap_err();
        assert!(matches!(err, DubError::DownloadFailed(_)));
    }

    #[tokio::test]
    async fn test_local_file_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("clip.mp4");
        std::fs::write(&src, "not really a video").unwrap();

        let dest = dir.path().join("out.mp4");
        fetch(&MediaSource::LocalFile(src), &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"not really a video");
    }
}
