//! End-to-end failure scenarios that run without network access or the
//! external media tools.

use std::path::PathBuf;

use voxdub::config::JobConfig;
use voxdub::errors::DubError;
use voxdub::models::{Job, MediaSource};
use voxdub::pipeline::Pipeline;
use voxdub::tts::TtsEngine;

fn job(source: MediaSource, work_dir: PathBuf) -> Job {
    Job {
        source,
        source_language: "en".to_string(),
        target_language: "tr".to_string(),
        engine: TtsEngine::Gtts,
        reference_audio: None,
        record_duration_secs: None,
        work_dir,
    }
}

fn artifact_files(work_dir: &std::path::Path) -> Vec<String> {
    match std::fs::read_dir(work_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn missing_source_video_fails_with_download_failed() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir = dir.path().join("job");
    let source = MediaSource::LocalFile(dir.path().join("no_such_video.mp4"));

    let pipeline = Pipeline::new(JobConfig::default());
    let err = pipeline.run(&job(source, work_dir.clone())).await.unwrap_err();

    assert!(matches!(err, DubError::DownloadFailed(_)));
    // nothing may be left behind, not even staged files
    assert!(artifact_files(&work_dir).is_empty());
}

#[tokio::test]
async fn unreachable_url_fails_with_download_failed() {
    // connection-refused locally, so this fails fast whether or not yt-dlp
    // is installed
    let dir = tempfile::tempdir().unwrap();
    let work_dir = dir.path().join("job");
    let source = MediaSource::Url("https://127.0.0.1:1/video".to_string());

    let pipeline = Pipeline::new(JobConfig::default());
    let err = pipeline.run(&job(source, work_dir.clone())).await.unwrap_err();

    assert!(matches!(err, DubError::DownloadFailed(_)));
    assert!(artifact_files(&work_dir).is_empty());
}

#[tokio::test]
async fn supplied_reference_audio_must_exist() {
    // The reference check fires in the resolve stage, but from_file is also
    // the contract the CLI relies on before burning API quota; validate it
    // at the service level here.
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("voice.wav");
    let err = voxdub::services::record::from_file(&missing).unwrap_err();
    assert!(matches!(err, DubError::ReferenceAudioNotFound(_)));
}
