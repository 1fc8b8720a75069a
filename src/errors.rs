use thiserror::Error;

#[derive(Debug, Error)]
pub enum DubError {
    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("audio extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("translation failed: {0}")]
    TranslationFailed(String),

    #[error("reference audio not found: {0}")]
    ReferenceAudioNotFound(String),

    #[error("recording device unavailable: {0}")]
    RecordingDeviceUnavailable(String),

    #[error("recorded sample too short: {0}")]
    RecordingTooShort(String),

    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("merge failed: {0}")]
    MergeFailed(String),

    #[error("invalid artifact kind: {0}")]
    InvalidArtifactKind(String),

    #[error("artifact is empty: {0}")]
    EmptyArtifact(String),

    #[error("artifact not ready: {0}")]
    ArtifactNotReady(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DubResult<T> = Result<T, DubError>;
