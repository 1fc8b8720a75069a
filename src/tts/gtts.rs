//! Google Translate TTS: the reliable cloud engine used both directly and
//! as the voice-cloning fallback.

use async_trait::async_trait;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

use super::{TtsBackend, TtsEngine, primary_subtag};
use crate::errors::{DubError, DubResult};

const TRANSLATE_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// The endpoint rejects long inputs, so text is synthesized in word-boundary
/// chunks and the MP3 streams are concatenated.
const MAX_CHUNK_CHARS: usize = 100;

static LANG_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("en", "en"),
        ("tr", "tr"),
        ("fr", "fr"),
        ("es", "es"),
        ("it", "it"),
        ("de", "de"),
        ("pt", "pt"),
        ("pl", "pl"),
        ("ru", "ru"),
        ("nl", "nl"),
        ("cs", "cs"),
        ("ar", "ar"),
        ("zh", "zh-CN"),
        ("ja", "ja"),
        ("ko", "ko"),
        ("hu", "hu"),
    ])
});

pub struct GttsClient {
    client: reqwest::Client,
}

impl GttsClient {
    pub fn new() -> GttsClient {
        GttsClient {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for GttsClient {
    fn default() -> Self {
        GttsClient::new()
    }
}

/// Map a language code to the endpoint's format, defaulting to English for
/// codes outside the table.
pub(crate) fn normalize_language(language: &str) -> &'static str {
    let lower = language.to_lowercase();
    if let Some(code) = LANG_MAP.get(lower.as_str()) {
        return code;
    }
    let primary = primary_subtag(language);
    if let Some(code) = LANG_MAP.get(primary.as_str()) {
        return code;
    }
    warn!("language {} not found in mapping, defaulting to English", language);
    "en"
}

/// Split text into chunks of at most `max_chars`, breaking on whitespace.
pub(crate) fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl TtsBackend for GttsClient {
    fn engine(&self) -> TtsEngine {
        TtsEngine::Gtts
    }

    fn supports_language(&self, _language: &str) -> bool {
        // unknown codes are mapped to a default rather than rejected
        true
    }

    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        _reference_audio: Option<&Path>,
        dest: &Path,
    ) -> DubResult<()> {
        let lang = normalize_language(language);
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        info!(
            "Generating speech with Google TTS (language: {}, {} chunks)",
            lang,
            chunks.len()
        );

        let mut audio: Vec<u8> = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let response = self
                .client
                .get(TRANSLATE_TTS_URL)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", lang),
                    ("q", chunk.as_str()),
                ])
                .send()
                .await
                .map_err(|e| DubError::SynthesisFailed(format!("gtts request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(DubError::SynthesisFailed(format!(
                    "gtts returned HTTP {status} for chunk {}/{}",
                    i + 1,
                    chunks.len()
                )));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| DubError::SynthesisFailed(format!("gtts read failed: {e}")))?;
            debug!("gtts chunk {}/{}: {} bytes", i + 1, chunks.len(), bytes.len());
            audio.extend_from_slice(&bytes);
        }

        if audio.is_empty() {
            return Err(DubError::SynthesisFailed(
                "gtts returned no audio data".to_string(),
            ));
        }
        tokio::fs::write(dest, &audio).await?;
        Ok(())
    }
}
