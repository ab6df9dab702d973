use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::normalizer::PcmAudio;
use crate::error::VoiceError;

/// Recognized speech, as returned by the ASR service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub language: Option<String>,
}

impl Transcription {
    pub fn new(text: impl AsRef<str>, language: Option<String>) -> Self {
        Self {
            text: text.as_ref().trim().to_string(),
            language: language.as_deref().and_then(normalize_language),
        }
    }
}

/// Speech-to-text backend. Implementations are created once and shared.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribe mono PCM, optionally forcing a language
    async fn transcribe(
        &self,
        audio: &PcmAudio,
        language: Option<&str>,
    ) -> Result<Transcription, VoiceError>;

    fn name(&self) -> &str;
}

/// Map whisper language output to a short code.
///
/// whisper.cpp reports codes (`en`), OpenAI-style servers report names
/// (`english`). Unknown names are passed through lowercased.
pub fn normalize_language(raw: &str) -> Option<String> {
    let lang = raw.trim().to_lowercase();
    if lang.is_empty() {
        return None;
    }
    let code = match lang.as_str() {
        "english" => "en",
        "chinese" | "mandarin" => "zh",
        "japanese" => "ja",
        "korean" => "ko",
        "german" => "de",
        "french" => "fr",
        "spanish" => "es",
        "italian" => "it",
        "portuguese" => "pt",
        "russian" => "ru",
        "cantonese" => "yue",
        other => other,
    };
    Some(code.to_string())
}
