use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::normalizer::PcmAudio;
use super::recognizer::{SpeechRecognizer, Transcription};
use crate::error::VoiceError;

/// OpenAI compatible `/audio/transcriptions` recognizer
/// (faster-whisper-server, whisper.cpp server, LocalAI, ...).
#[derive(Debug, Clone)]
pub struct WhisperHttpRecognizer {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,
    #[serde(default)]
    language: Option<String>,
}

impl WhisperHttpRecognizer {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        info!("Initialized WhisperHttpRecognizer: model={}, base_url={}", model, base_url);
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperHttpRecognizer {
    #[instrument(skip(self, audio), fields(samples = audio.samples.len()))]
    async fn transcribe(
        &self,
        audio: &PcmAudio,
        language: Option<&str>,
    ) -> Result<Transcription, VoiceError> {
        let wav = audio
            .to_wav_bytes()
            .map_err(|e| VoiceError::transcription(format!("Failed to encode WAV: {e}")))?;

        let file_part = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::transcription(format!("Invalid MIME type: {e}")))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        let url = format!("{}/audio/transcriptions", self.base_url);
        let mut builder = self.client.post(&url).multipart(form);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| VoiceError::transcription(format!("Transcription request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::transcription(format!("HTTP {status}: {body}")));
        }

        let result: VerboseTranscription = response.json().await.map_err(|e| {
            VoiceError::transcription(format!("Failed to parse transcription response: {e}"))
        })?;

        debug!(language = ?result.language, "Transcription complete");
        Ok(Transcription::new(result.text, result.language))
    }

    fn name(&self) -> &str {
        "whisper_http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn audio() -> PcmAudio {
        PcmAudio {
            samples: vec![0.0; 1600],
            sample_rate: 16_000,
        }
    }

    #[tokio::test]
    async fn transcribe_maps_language_name() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": " Hello, world! ",
                "language": "english",
                "duration": 0.1
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let recognizer = WhisperHttpRecognizer::new(
            mock_server.uri(),
            "whisper-large-v3".to_string(),
            Some("test-key".to_string()),
        );
        let t = recognizer.transcribe(&audio(), None).await.unwrap();

        assert_eq!(t.text, "Hello, world!");
        assert_eq!(t.language.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn server_error_is_transcription_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
            .mount(&mock_server)
            .await;

        let recognizer =
            WhisperHttpRecognizer::new(mock_server.uri(), "whisper".to_string(), None);
        let err = recognizer.transcribe(&audio(), Some("en")).await.unwrap_err();

        assert!(matches!(err, VoiceError::Transcription { .. }));
        assert!(err.to_string().contains("503"));
    }
}
