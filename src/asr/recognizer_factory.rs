use std::sync::Arc;
use tracing::info;
use anyhow::Result;

use super::recognizer::SpeechRecognizer;
use super::whisper_cli::WhisperCliRecognizer;
use super::whisper_http::WhisperHttpRecognizer;
use crate::config::RecognizerConfig;

/// Factory for creating speech recognizers
pub struct RecognizerFactory;

impl RecognizerFactory {
    pub fn create(config: &RecognizerConfig) -> Result<Arc<dyn SpeechRecognizer>> {
        info!("Initializing ASR: {}", config.provider);

        match config.provider.as_str() {
            "whisper_cli" | "whisper_cpp" => Ok(Arc::new(WhisperCliRecognizer::new(
                &config.executable,
                &config.model_path,
                config.threads,
            ))),
            "whisper_http" | "openai_whisper" => Ok(Arc::new(WhisperHttpRecognizer::new(
                config.base_url.clone(),
                config.model.clone(),
                config.api_key.clone(),
            ))),
            other => Err(anyhow::anyhow!("Unsupported ASR provider: {}", other)),
        }
    }
}
