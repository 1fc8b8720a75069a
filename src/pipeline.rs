//! The end-to-end dubbing pipeline: one [`Job`] in, two deliverables out.
//!
//! Stages run strictly in sequence; every stage consumes its predecessor's
//! finalized artifact through the [`ArtifactStore`] and finalizes its own
//! output before the next stage starts.

use log::{error, info, warn};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::config::JobConfig;
use crate::errors::{DubError, DubResult};
use crate::models::{Job, TranscriptSegment, format_vtt, parse_vtt};
use crate::services::{download, extract, merge, record, transcribe, translate};
use crate::tts::selector::{EngineOutcome, EngineSelector};
use crate::tts::EngineRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Download,
    ExtractAudio,
    Transcribe,
    Translate,
    ResolveReference,
    Synthesize,
    Merge,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Download => "download",
            Stage::ExtractAudio => "extract_audio",
            Stage::Transcribe => "transcribe",
            Stage::Translate => "translate",
            Stage::ResolveReference => "resolve_reference",
            Stage::Synthesize => "synthesize",
            Stage::Merge => "merge",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub duration: Duration,
}

/// What a successful run delivers.
#[derive(Debug)]
pub struct RunOutcome {
    pub dubbed_video: PathBuf,
    pub dubbed_audio: PathBuf,
    pub engine: EngineOutcome,
    pub reports: Vec<StageReport>,
}

pub struct Pipeline {
    config: JobConfig,
}

impl Pipeline {
    pub fn new(config: JobConfig) -> Pipeline {
        Pipeline { config }
    }

    /// Run a job end to end. Intermediate artifacts are cleaned up on every
    /// exit path; only the deliverables (and a recorded reference sample)
    /// survive.
    pub async fn run(&self, job: &Job) -> DubResult<RunOutcome> {
        let mut store = ArtifactStore::new(&job.work_dir)?;
        let result = self.run_stages(job, &mut store).await;

        // A recorded sample took user effort; keep it even when a later
        // stage failed. A supplied file stays where the user put it.
        let reference_recorded =
            job.reference_audio.is_none() && store.is_ready(ArtifactKind::ReferenceAudio);

        let mut keep = Vec::new();
        if reference_recorded {
            keep.push(ArtifactKind::ReferenceAudio);
        }
        if result.is_ok() {
            keep.push(ArtifactKind::DubbedAudio);
            keep.push(ArtifactKind::DubbedVideo);
        }
        store.cleanup(&keep);

        result
    }

    async fn run_stages(&self, job: &Job, store: &mut ArtifactStore) -> DubResult<RunOutcome> {
        let mut reports = Vec::new();

        // 1. Download the source video
        let started = Instant::now();
        info!("[1/7] downloading source video");
        let tmp = store.stage_path(ArtifactKind::RawVideo);
        download::fetch(&job.source, &tmp)
            .await
            .map_err(|e| stage_failed(Stage::Download, e))?;
        store
            .finalize(ArtifactKind::RawVideo, &tmp)
            .map_err(|e| stage_failed(Stage::Download, e))?;
        report(&mut reports, Stage::Download, started);

        // 2. Extract the audio track
        let started = Instant::now();
        info!("[2/7] extracting audio");
        let video_path = store.get(ArtifactKind::RawVideo)?;
        let tmp = store.stage_path(ArtifactKind::RawAudio);
        extract::extract_audio(&video_path, &tmp)
            .await
            .map_err(|e| stage_failed(Stage::ExtractAudio, e))?;
        store
            .finalize(ArtifactKind::RawAudio, &tmp)
            .map_err(|e| stage_failed(Stage::ExtractAudio, e))?;
        report(&mut reports, Stage::ExtractAudio, started);

        // 3. Transcribe
        let started = Instant::now();
        info!("[3/7] transcribing audio ({})", job.source_language);
        let audio_path = store.get(ArtifactKind::RawAudio)?;
        let tmp = store.stage_path(ArtifactKind::Transcript);
        transcribe::transcribe_audio(
            &audio_path,
            &tmp,
            &job.source_language,
            &self.config.openai_api_key,
        )
        .await
        .map_err(|e| stage_failed(Stage::Transcribe, e))?;
        let segments = load_segments(&tmp)
            .map_err(|e| stage_failed(Stage::Transcribe, DubError::TranscriptionFailed(e)))?;
        store
            .finalize(ArtifactKind::Transcript, &tmp)
            .map_err(|e| stage_failed(Stage::Transcribe, e))?;
        info!("transcript has {} segments", segments.len());
        report(&mut reports, Stage::Transcribe, started);

        // 4. Translate, segment by segment
        let started = Instant::now();
        info!(
            "[4/7] translating transcript ({} -> {})",
            job.source_language, job.target_language
        );
        let translated = translate::translate_segments(
            &segments,
            &job.source_language,
            &job.target_language,
            &self.config.openai_api_key,
        )
        .await
        .map_err(|e| stage_failed(Stage::Translate, e))?;
        let tmp = store.stage_path(ArtifactKind::Translation);
        std::fs::write(&tmp, format_vtt(&translated))
            .map_err(|e| stage_failed(Stage::Translate, e.into()))?;
        store
            .finalize(ArtifactKind::Translation, &tmp)
            .map_err(|e| stage_failed(Stage::Translate, e))?;
        report(&mut reports, Stage::Translate, started);

        // 5. Resolve the reference voice sample (voice cloning only)
        let reference_audio = if job.engine.is_voice_clone() {
            let started = Instant::now();
            info!("[5/7] resolving reference audio");
            let path = match (&job.reference_audio, job.record_duration_secs) {
                (Some(path), _) => {
                    record::from_file(path).map_err(|e| stage_failed(Stage::ResolveReference, e))?
                }
                (None, Some(duration)) => record::record(store, duration)
                    .map_err(|e| stage_failed(Stage::ResolveReference, e))?,
                (None, None) => {
                    return Err(stage_failed(
                        Stage::ResolveReference,
                        DubError::ReferenceAudioNotFound(
                            "voice cloning needs --reference-audio or --record".to_string(),
                        ),
                    ));
                }
            };
            report(&mut reports, Stage::ResolveReference, started);
            Some(path)
        } else {
            info!("[5/7] no reference audio needed for {}", job.engine);
            None
        };

        // 6. Synthesize speech (with internal engine fallback)
        let started = Instant::now();
        info!("[6/7] synthesizing speech ({})", job.engine);
        let translation_path = store.get(ArtifactKind::Translation)?;
        let content = std::fs::read_to_string(&translation_path)?;
        let translated_segments = parse_vtt(&content)
            .map_err(|e| stage_failed(Stage::Synthesize, DubError::SynthesisFailed(e.to_string())))?;
        let text = translated_segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let request = EngineRequest {
            engine: job.engine,
            language: job.target_language.clone(),
            reference_audio,
        };
        let selector = EngineSelector::for_request(&request);
        let tmp = store.stage_path(ArtifactKind::DubbedAudio);
        let mut outcome = selector
            .synthesize(&request, &text, &tmp)
            .await
            .map_err(|e| stage_failed(Stage::Synthesize, e))?;
        outcome.audio_path = store
            .finalize(ArtifactKind::DubbedAudio, &tmp)
            .map_err(|e| stage_failed(Stage::Synthesize, e))?;
        if outcome.fell_back() {
            warn!(
                "requested {} but used {}: the cloned-voice timbre was not achieved",
                outcome.requested, outcome.engine_used
            );
        }
        report(&mut reports, Stage::Synthesize, started);

        // 7. Merge the dubbed audio back into the video
        let started = Instant::now();
        info!("[7/7] merging dubbed audio into video");
        let video_path = store.get(ArtifactKind::RawVideo)?;
        let audio_path = store.get(ArtifactKind::DubbedAudio)?;
        let tmp = store.stage_path(ArtifactKind::DubbedVideo);
        merge::merge_video_audio(&video_path, &audio_path, &tmp, self.config.duration_tolerance)
            .await
            .map_err(|e| stage_failed(Stage::Merge, e))?;
        store
            .finalize(ArtifactKind::DubbedVideo, &tmp)
            .map_err(|e| stage_failed(Stage::Merge, e))?;
        report(&mut reports, Stage::Merge, started);

        Ok(RunOutcome {
            dubbed_video: store.get(ArtifactKind::DubbedVideo)?,
            dubbed_audio: store.get(ArtifactKind::DubbedAudio)?,
            engine: outcome,
            reports,
        })
    }
}

fn load_segments(path: &std::path::Path) -> Result<Vec<TranscriptSegment>, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let segments = parse_vtt(&content).map_err(|e| e.to_string())?;
    if segments.is_empty() {
        return Err("no speech segments recognized".to_string());
    }
    Ok(segments)
}

/// Log the failing stage with its cause; the error itself is passed through
/// untouched so callers can still match on the taxonomy.
fn stage_failed(stage: Stage, err: DubError) -> DubError {
    error!("stage {} failed: {}", stage, err);
    err
}

fn report(reports: &mut Vec<StageReport>, stage: Stage, started: Instant) {
    let duration = started.elapsed();
    info!("stage {} completed in {:.1}s", stage, duration.as_secs_f64());
    reports.push(StageReport { stage, duration });
}
