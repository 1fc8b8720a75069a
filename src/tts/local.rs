//! Locally hosted neural synthesis through the Coqui TTS command line tool.
//!
//! Three engines ride on the same wrapper with different models: YourTTS
//! (`coqui`), Bark (`bark`) and XTTS-v2 (`voice_clone`, conditioned on the
//! reference sample).

use async_trait::async_trait;
use log::{debug, info};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::{TtsBackend, TtsEngine, primary_subtag};
use crate::errors::{DubError, DubResult};
use crate::services::last_stderr_line;

const XTTS_MODEL: &str = "tts_models/multilingual/multi-dataset/xtts_v2";
const YOUR_TTS_MODEL: &str = "tts_models/multilingual/multi-dataset/your_tts";
const BARK_MODEL: &str = "tts_models/multilingual/multi-dataset/bark";

/// Languages the XTTS-v2 checkpoint ships with.
static XTTS_LANGUAGES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "en", "es", "fr", "de", "it", "pt", "pl", "tr", "ru", "nl", "cs", "ar", "zh-cn", "hu",
        "ko", "ja", "hi",
    ])
});

/// Bark voice presets per language; English gets the canonical speaker.
static BARK_SPEAKERS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("en", "v2/en_speaker_6"),
        ("de", "v2/de_speaker_0"),
        ("es", "v2/es_speaker_0"),
        ("fr", "v2/fr_speaker_0"),
        ("hi", "v2/hi_speaker_0"),
        ("it", "v2/it_speaker_0"),
        ("ja", "v2/ja_speaker_0"),
        ("ko", "v2/ko_speaker_0"),
        ("pl", "v2/pl_speaker_0"),
        ("pt", "v2/pt_speaker_0"),
        ("ru", "v2/ru_speaker_0"),
        ("tr", "v2/tr_speaker_0"),
        ("zh", "v2/zh_speaker_0"),
    ])
});

pub struct CoquiCliBackend {
    engine: TtsEngine,
    model: &'static str,
}

impl CoquiCliBackend {
    pub fn xtts() -> CoquiCliBackend {
        CoquiCliBackend {
            engine: TtsEngine::VoiceClone,
            model: XTTS_MODEL,
        }
    }

    pub fn your_tts() -> CoquiCliBackend {
        CoquiCliBackend {
            engine: TtsEngine::Coqui,
            model: YOUR_TTS_MODEL,
        }
    }

    pub fn bark() -> CoquiCliBackend {
        CoquiCliBackend {
            engine: TtsEngine::Bark,
            model: BARK_MODEL,
        }
    }

    fn cli_path() -> DubResult<PathBuf> {
        which::which("tts").map_err(|_| {
            DubError::SynthesisFailed(
                "Coqui TTS CLI not found; install it with 'pip install TTS'".to_string(),
            )
        })
    }
}

/// XTTS uses lowercase codes and a regional code for Chinese.
pub(crate) fn xtts_language(language: &str) -> String {
    let primary = primary_subtag(language);
    if primary == "zh" {
        "zh-cn".to_string()
    } else {
        primary
    }
}

/// YourTTS was trained on regional variants for French and Portuguese.
pub(crate) fn your_tts_language(language: &str) -> Option<&'static str> {
    match primary_subtag(language).as_str() {
        "en" => Some("en"),
        "fr" => Some("fr-fr"),
        "pt" => Some("pt-br"),
        _ => None,
    }
}

#[async_trait]
impl TtsBackend for CoquiCliBackend {
    fn engine(&self) -> TtsEngine {
        self.engine
    }

    fn supports_language(&self, language: &str) -> bool {
        match self.engine {
            TtsEngine::VoiceClone => XTTS_LANGUAGES.contains(xtts_language(language).as_str()),
            TtsEngine::Bark => BARK_SPEAKERS.contains_key(primary_subtag(language).as_str()),
            TtsEngine::Coqui => your_tts_language(language).is_some(),
            TtsEngine::Gtts => false,
        }
    }

    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        reference_audio: Option<&Path>,
        dest: &Path,
    ) -> DubResult<()> {
        let cli = Self::cli_path()?;
        let mut cmd = Command::new(cli);
        cmd.arg("--model_name")
            .arg(self.model)
            .arg("--text")
            .arg(text)
            .arg("--out_path")
            .arg(dest);

        match self.engine {
            TtsEngine::VoiceClone => {
                let reference = reference_audio.ok_or_else(|| {
                    DubError::SynthesisFailed(
                        "voice cloning requires a reference audio sample".to_string(),
                    )
                })?;
                cmd.arg("--speaker_wav")
                    .arg(reference)
                    .arg("--language_idx")
                    .arg(xtts_language(language));
            }
            TtsEngine::Coqui => {
                if let Some(idx) = your_tts_language(language) {
                    cmd.arg("--language_idx").arg(idx);
                }
            }
            TtsEngine::Bark => {
                if let Some(speaker) = BARK_SPEAKERS.get(primary_subtag(language).as_str()) {
                    cmd.arg("--speaker_idx").arg(speaker);
                }
            }
            TtsEngine::Gtts => {}
        }

        info!(
            "Generating speech with {} ({} chars of text)",
            self.model,
            text.len()
        );
        let output = cmd
            .output()
            .await
            .map_err(|e| DubError::SynthesisFailed(format!("failed to launch tts: {e}")))?;

        if !output.status.success() {
            return Err(DubError::SynthesisFailed(format!(
                "tts exited with {}: {}",
                output.status,
                last_stderr_line(&output.stderr)
            )));
        }
        debug!("speech written to {}", dest.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xtts_language_support() {
        let backend = CoquiCliBackend::xtts();
        assert!(backend.supports_language("tr"));
        assert!(backend.supports_language("zh"));
        assert!(backend.supports_language("PT-br"));
        assert!(!backend.supports_language("sw"));
        assert!(!backend.supports_language("th"));
    }

    #[test]
    fn test_xtts_language_normalization() {
        assert_eq!(xtts_language("zh"), "zh-cn");
        assert_eq!(xtts_language("zh-CN"), "zh-cn");
        assert_eq!(xtts_language("TR"), "tr");
    }

    #[test]
    fn test_your_tts_language() {
        assert_eq!(your_tts_language("fr"), Some("fr-fr"));
        assert_eq!(your_tts_language("pt-BR"), Some("pt-br"));
        assert_eq!(your_tts_language("tr"), None);
    }

    #[test]
    fn test_bark_language_support() {
        let backend = CoquiCliBackend::bark();
        assert!(backend.supports_language("tr"));
        assert!(!backend.supports_language("cs"));
    }
}
