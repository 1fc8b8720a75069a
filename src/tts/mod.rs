//! TTS engines and the selection/fallback machinery.

pub mod gtts;
pub mod local;
pub mod selector;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::DubResult;

/// The closed set of synthesis engines. The fallback policy is specific to
/// each variant, so this is a tagged enum rather than open-ended dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsEngine {
    Gtts,
    Bark,
    Coqui,
    VoiceClone,
}

impl TtsEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            TtsEngine::Gtts => "gtts",
            TtsEngine::Bark => "bark",
            TtsEngine::Coqui => "coqui",
            TtsEngine::VoiceClone => "voice_clone",
        }
    }

    pub fn is_voice_clone(self) -> bool {
        self == TtsEngine::VoiceClone
    }
}

impl fmt::Display for TtsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TtsEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<TtsEngine, String> {
        match s {
            "gtts" => Ok(TtsEngine::Gtts),
            "bark" => Ok(TtsEngine::Bark),
            "coqui" => Ok(TtsEngine::Coqui),
            "voice_clone" => Ok(TtsEngine::VoiceClone),
            other => Err(format!(
                "unknown TTS engine '{other}' (expected gtts, bark, coqui or voice_clone)"
            )),
        }
    }
}

/// One synthesis request, constructed once per job and consumed once by the
/// selector.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub engine: TtsEngine,
    pub language: String,
    /// Required for voice cloning, ignored by the other engines.
    pub reference_audio: Option<PathBuf>,
}

/// A concrete synthesis backend.
#[async_trait]
pub trait TtsBackend: Send + Sync {
    fn engine(&self) -> TtsEngine;

    /// Whether the backend can speak the given language. Checked before the
    /// backend is loaded so unsupported languages never pay the load cost.
    fn supports_language(&self, language: &str) -> bool;

    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        reference_audio: Option<&Path>,
        dest: &Path,
    ) -> DubResult<()>;
}

/// Get the backend implementation for an engine.
pub fn backend_for(engine: TtsEngine) -> Box<dyn TtsBackend> {
    match engine {
        TtsEngine::Gtts => Box::new(gtts::GttsClient::new()),
        TtsEngine::Bark => Box::new(local::CoquiCliBackend::bark()),
        TtsEngine::Coqui => Box::new(local::CoquiCliBackend::your_tts()),
        TtsEngine::VoiceClone => Box::new(local::CoquiCliBackend::xtts()),
    }
}

/// Lowercased primary language subtag ("pt-BR" -> "pt").
pub(crate) fn primary_subtag(language: &str) -> String {
    let lower = language.to_lowercase();
    lower
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_from_str() {
        assert_eq!("gtts".parse::<TtsEngine>().unwrap(), TtsEngine::Gtts);
        assert_eq!(
            "voice_clone".parse::<TtsEngine>().unwrap(),
            TtsEngine::VoiceClone
        );
        assert!("espeak".parse::<TtsEngine>().is_err());
    }

    #[test]
    fn test_primary_subtag() {
        assert_eq!(primary_subtag("pt-BR"), "pt");
        assert_eq!(primary_subtag("zh_CN"), "zh");
        assert_eq!(primary_subtag("en"), "en");
    }
}
