use log::{debug, info};
use reqwest::multipart::{Form, Part};
use std::path::Path;

use crate::errors::{DubError, DubResult};

const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Transcribe an audio file with the Whisper API and write the VTT
/// response to `dest`.
pub async fn transcribe_audio(
    audio_path: &Path,
    dest: &Path,
    language: &str,
    api_key: &str,
) -> DubResult<()> {
    if api_key.trim().is_empty() {
        return Err(DubError::TranscriptionFailed(
            "OpenAI API key is required (set OPENAI_API_KEY)".to_string(),
        ));
    }

    info!(
        "Transcribing audio: {} (language: {})",
        audio_path.display(),
        language
    );

    let content = tokio::fs::read(audio_path).await?;
    debug!("Read audio file, size: {} bytes", content.len());

    let filename = audio_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio.wav".to_string());

    let part = Part::bytes(content)
        .file_name(filename)
        .mime_str("application/octet-stream")?;
    let form = Form::new()
        .text("model", "whisper-1")
        .text("response_format", "vtt")
        .text("language", language.to_string())
        .part("file", part);

    let client = reqwest::Client::new();
    let response = client
        .post(TRANSCRIPTION_URL)
        .header("Authorization", format!("Bearer {}", api_key))
        .multipart(form)
        .send()
        .await
        .map_err(|e| DubError::TranscriptionFailed(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DubError::TranscriptionFailed(format!(
            "API request failed (HTTP {status}): {body}"
        )));
    }

    let vtt = response
        .text()
        .await
        .map_err(|e| DubError::TranscriptionFailed(format!("failed to read response: {e}")))?;
    debug!("Received transcript, length: {} bytes", vtt.len());

    tokio::fs::write(dest, vtt).await?;
    Ok(())
}
