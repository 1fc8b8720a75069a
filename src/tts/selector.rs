//! Engine selection and fallback: turn an [`EngineRequest`] into speech,
//! tolerating backend unavailability.
//!
//! The decision flow is an explicit state machine rather than nested error
//! handling so every transition is observable and testable:
//! `Idle -> AttemptingPrimary -> {Success | AttemptingFallback} ->
//! {Success | Exhausted}`.

use log::{debug, error, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};

use super::{EngineRequest, TtsBackend, TtsEngine, backend_for};
use crate::errors::{DubError, DubResult};

/// Floor below which synthesis output is treated as degenerate.
const MIN_OUTPUT_SECS: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Idle,
    AttemptingPrimary,
    AttemptingFallback,
    Success,
    Exhausted,
}

#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The backend was not tried at all (e.g. unsupported language).
    Skipped(String),
    /// The backend was tried and failed.
    Failed(String),
}

/// One entry of the diagnostic attempt log.
#[derive(Debug, Clone)]
pub struct EngineAttempt {
    pub engine: TtsEngine,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for EngineAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Skipped(reason) => write!(f, "{} skipped ({})", self.engine, reason),
            AttemptOutcome::Failed(reason) => write!(f, "{} failed ({})", self.engine, reason),
        }
    }
}

/// Result of a synthesis run. `engine_used` may differ from `requested`
/// when the fallback had to step in; the job still succeeds, it just loses
/// the cloned timbre.
#[derive(Debug)]
pub struct EngineOutcome {
    pub requested: TtsEngine,
    pub engine_used: TtsEngine,
    pub audio_path: PathBuf,
    pub attempts: Vec<EngineAttempt>,
}

impl EngineOutcome {
    pub fn fell_back(&self) -> bool {
        self.engine_used != self.requested
    }
}

pub struct EngineSelector {
    backends: Vec<Box<dyn TtsBackend>>,
}

impl EngineSelector {
    /// Build the backend chain for a request.
    ///
    /// Voice cloning gets the cloud engine as fallback; simple requests run
    /// the requested backend alone, so their first failure exhausts the run.
    pub fn for_request(request: &EngineRequest) -> EngineSelector {
        let backends = match request.engine {
            TtsEngine::VoiceClone => vec![
                backend_for(TtsEngine::VoiceClone),
                backend_for(TtsEngine::Gtts),
            ],
            engine => vec![backend_for(engine)],
        };
        EngineSelector { backends }
    }

    /// Inject a specific backend chain (tests, custom priority lists).
    pub fn with_backends(backends: Vec<Box<dyn TtsBackend>>) -> EngineSelector {
        EngineSelector { backends }
    }

    /// Run the state machine over the backend chain, writing the winning
    /// backend's audio to `dest`.
    pub async fn synthesize(
        &self,
        request: &EngineRequest,
        text: &str,
        dest: &Path,
    ) -> DubResult<EngineOutcome> {
        let mut state = SelectorState::Idle;
        let mut attempts: Vec<EngineAttempt> = Vec::new();
        debug!("synthesis state: {:?}", state);

        for (position, backend) in self.backends.iter().enumerate() {
            state = if position == 0 {
                SelectorState::AttemptingPrimary
            } else {
                SelectorState::AttemptingFallback
            };
            debug!("synthesis state: {:?} ({})", state, backend.engine());

            // Support check first: an unsupported language must not pay the
            // backend's load cost, but the skip still shows up in the log.
            if !backend.supports_language(&request.language) {
                let reason = format!("language '{}' is not supported", request.language);
                warn!("{}: {}, skipping", backend.engine(), reason);
                attempts.push(EngineAttempt {
                    engine: backend.engine(),
                    outcome: AttemptOutcome::Skipped(reason),
                });
                continue;
            }

            let result = backend
                .synthesize(text, &request.language, request.reference_audio.as_deref(), dest)
                .await;
            match result {
                Ok(()) => {
                    if let Err(reason) = validate_output(dest) {
                        warn!("{} produced unusable audio: {}", backend.engine(), reason);
                        let _ = std::fs::remove_file(dest);
                        attempts.push(EngineAttempt {
                            engine: backend.engine(),
                            outcome: AttemptOutcome::Failed(reason),
                        });
                        continue;
                    }

                    state = SelectorState::Success;
                    info!("synthesis state: {:?} ({})", state, backend.engine());
                    if backend.engine() != request.engine {
                        warn!(
                            "fell back from {} to {}; the requested voice timbre is lost",
                            request.engine,
                            backend.engine()
                        );
                    }
                    return Ok(EngineOutcome {
                        requested: request.engine,
                        engine_used: backend.engine(),
                        audio_path: dest.to_path_buf(),
                        attempts,
                    });
                }
                Err(err) => {
                    warn!("{} synthesis attempt failed: {}", backend.engine(), err);
                    attempts.push(EngineAttempt {
                        engine: backend.engine(),
                        outcome: AttemptOutcome::Failed(err.to_string()),
                    });
                }
            }
        }

        state = SelectorState::Exhausted;
        error!("synthesis state: {:?}", state);
        let summary = attempts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(DubError::SynthesisFailed(format!(
            "all engines exhausted: {summary}"
        )))
    }
}

/// Reject degenerate output: an empty file, or a WAV shorter than the
/// floor. Non-WAV output is only length-checked.
fn validate_output(path: &Path) -> Result<(), String> {
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err("no audio data written".to_string());
    }
    if let Ok(reader) = hound::WavReader::open(path) {
        let secs = f64::from(reader.duration()) / f64::from(reader.spec().sample_rate);
        if secs < MIN_OUTPUT_SECS {
            return Err(format!("output is only {secs:.2}s long"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockBackend {
        engine: TtsEngine,
        languages: Vec<&'static str>,
        fail: bool,
        write_empty: bool,
        calls: Arc<AtomicUsize>,
    }

    impl MockBackend {
        fn new(engine: TtsEngine, languages: &[&'static str]) -> MockBackend {
            MockBackend {
                engine,
                languages: languages.to_vec(),
                fail: false,
                write_empty: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(mut self) -> MockBackend {
            self.fail = true;
            self
        }

        fn silent(mut self) -> MockBackend {
            self.write_empty = true;
            self
        }
    }

    #[async_trait]
    impl TtsBackend for MockBackend {
        fn engine(&self) -> TtsEngine {
            self.engine
        }

        fn supports_language(&self, language: &str) -> bool {
            self.languages.contains(&language)
        }

        async fn synthesize(
            &self,
            _text: &str,
            _language: &str,
            _reference_audio: Option<&Path>,
            dest: &Path,
        ) -> DubResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DubError::SynthesisFailed("backend exploded".to_string()));
            }
            let data: &[u8] = if self.write_empty { b"" } else { b"fake-audio" };
            std::fs::write(dest, data)?;
            Ok(())
        }
    }

    fn clone_request(language: &str) -> EngineRequest {
        EngineRequest {
            engine: TtsEngine::VoiceClone,
            language: language.to_string(),
            reference_audio: None,
        }
    }

    #[tokio::test]
    async fn test_unsupported_language_short_circuits_without_loading_primary() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp3");

        let primary = MockBackend::new(TtsEngine::VoiceClone, &["en"]);
        let primary_calls = Arc::clone(&primary.calls);
        let fallback = MockBackend::new(TtsEngine::Gtts, &["en", "tr"]);

        let selector = EngineSelector::with_backends(vec![Box::new(primary), Box::new(fallback)]);
        let outcome = selector
            .synthesize(&clone_request("tr"), "merhaba", &dest)
            .await
            .unwrap();

        assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.engine_used, TtsEngine::Gtts);
        assert!(outcome.fell_back());
        assert_eq!(outcome.attempts.len(), 1);
        assert!(matches!(
            outcome.attempts[0].outcome,
            AttemptOutcome::Skipped(_)
        ));
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp3");

        let primary = MockBackend::new(TtsEngine::VoiceClone, &["tr"]).failing();
        let fallback = MockBackend::new(TtsEngine::Gtts, &["tr"]);
        let fallback_calls = Arc::clone(&fallback.calls);

        let selector = EngineSelector::with_backends(vec![Box::new(primary), Box::new(fallback)]);
        let outcome = selector
            .synthesize(&clone_request("tr"), "merhaba", &dest)
            .await
            .unwrap();

        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.engine_used, TtsEngine::Gtts);
        assert_eq!(outcome.attempts.len(), 1);
        assert!(matches!(
            outcome.attempts[0].outcome,
            AttemptOutcome::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_primary_success_never_touches_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp3");

        let primary = MockBackend::new(TtsEngine::VoiceClone, &["tr"]);
        let fallback = MockBackend::new(TtsEngine::Gtts, &["tr"]);
        let fallback_calls = Arc::clone(&fallback.calls);

        let selector = EngineSelector::with_backends(vec![Box::new(primary), Box::new(fallback)]);
        let outcome = selector
            .synthesize(&clone_request("tr"), "merhaba", &dest)
            .await
            .unwrap();

        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.engine_used, TtsEngine::VoiceClone);
        assert!(!outcome.fell_back());
        assert!(outcome.attempts.is_empty());
    }

    #[tokio::test]
    async fn test_exhaustion_is_synthesis_failed() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp3");

        let primary = MockBackend::new(TtsEngine::VoiceClone, &["tr"]).failing();
        let fallback = MockBackend::new(TtsEngine::Gtts, &["tr"]).failing();

        let selector = EngineSelector::with_backends(vec![Box::new(primary), Box::new(fallback)]);
        let err = selector
            .synthesize(&clone_request("tr"), "merhaba", &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, DubError::SynthesisFailed(_)));
    }

    #[tokio::test]
    async fn test_simple_request_has_no_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp3");

        let backend = MockBackend::new(TtsEngine::Coqui, &["en"]).failing();
        let calls = Arc::clone(&backend.calls);

        let selector = EngineSelector::with_backends(vec![Box::new(backend)]);
        let request = EngineRequest {
            engine: TtsEngine::Coqui,
            language: "en".to_string(),
            reference_audio: None,
        };
        let err = selector.synthesize(&request, "hello", &dest).await.unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, DubError::SynthesisFailed(_)));
    }

    #[tokio::test]
    async fn test_degenerate_output_triggers_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp3");

        let primary = MockBackend::new(TtsEngine::VoiceClone, &["tr"]).silent();
        let fallback = MockBackend::new(TtsEngine::Gtts, &["tr"]);

        let selector = EngineSelector::with_backends(vec![Box::new(primary), Box::new(fallback)]);
        let outcome = selector
            .synthesize(&clone_request("tr"), "merhaba", &dest)
            .await
            .unwrap();

        assert_eq!(outcome.engine_used, TtsEngine::Gtts);
        assert_eq!(outcome.attempts.len(), 1);
        assert!(matches!(
            outcome.attempts[0].outcome,
            AttemptOutcome::Failed(_)
        ));
        assert_eq!(std::fs::read(&dest).unwrap(), b"fake-audio");
    }
}
