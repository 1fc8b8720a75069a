use anyhow::{Result, anyhow};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::{DubError, DubResult};
use crate::models::TranscriptSegment;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Translate the transcript segment by segment.
///
/// The returned sequence has the same length and order as the input;
/// timing metadata is carried over untouched so it can be reattached.
pub async fn translate_segments(
    segments: &[TranscriptSegment],
    source_lang: &str,
    target_lang: &str,
    api_key: &str,
) -> DubResult<Vec<TranscriptSegment>> {
    if segments.is_empty() {
        return Err(DubError::TranslationFailed(
            "transcript contains no segments".to_string(),
        ));
    }
    if api_key.trim().is_empty() {
        return Err(DubError::TranslationFailed(
            "OpenAI API key is required (set OPENAI_API_KEY)".to_string(),
        ));
    }

    info!(
        "Translating {} segments ({} -> {})",
        segments.len(),
        source_lang,
        target_lang
    );

    let client = reqwest::Client::new();
    let mut texts = Vec::with_capacity(segments.len());
    for segment in segments {
        let translated = translate_one(&client, &segment.text, source_lang, target_lang, api_key)
            .await
            .map_err(|e| {
                DubError::TranslationFailed(format!("segment {}: {}", segment.index, e))
            })?;
        debug!("segment {} translated ({} chars)", segment.index, translated.len());
        texts.push(translated);
    }

    replace_texts(segments, texts)
}

/// Reattach translated texts to the original segment timings.
pub(crate) fn replace_texts(
    segments: &[TranscriptSegment],
    texts: Vec<String>,
) -> DubResult<Vec<TranscriptSegment>> {
    if texts.len() != segments.len() {
        return Err(DubError::TranslationFailed(format!(
            "translation produced {} segments for {} inputs",
            texts.len(),
            segments.len()
        )));
    }
    Ok(segments
        .iter()
        .zip(texts)
        .map(|(segment, text)| TranscriptSegment {
            text,
            ..segment.clone()
        })
        .collect())
}

async fn translate_one(
    client: &reqwest::Client,
    text: &str,
    source_lang: &str,
    target_lang: &str,
    api_key: &str,
) -> Result<String> {
    let request = ChatRequest {
        model: "gpt-3.5-turbo".to_string(),
        messages: vec![
            Message {
                role: "system".to_string(),
                content: format!(
                    "You are a professional translator. Translate the following text \
                     from {source_lang} to {target_lang}. Keep the text structure and \
                     formatting intact. Only return the translated text, no explanations \
                     or additional text."
                ),
            },
            Message {
                role: "user".to_string(),
                content: text.to_string(),
            },
        ],
        temperature: 0.3,
    };

    let response = client
        .post(CHAT_COMPLETIONS_URL)
        .header("Authorization", format!("Bearer {}", api_key))
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("API request failed (HTTP {status}): {body}"));
    }

    let completion: ChatCompletion = response.json().await?;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("response contained no choices"))?;
    Ok(choice.message.content.trim().to_string())
}
