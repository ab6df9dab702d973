use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::generator::{build_prompt, ResponseGenerator};
use crate::conversations::Turn;
use crate::error::VoiceError;

/// Ollama completion backend.
/// Sends the whole conversation as one raw role-labeled prompt.
#[derive(Debug, Clone)]
pub struct OllamaLLM {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    raw: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaLLM {
    pub fn new(base_url: String, model: String, max_tokens: u32, temperature: Option<f32>) -> Self {
        info!("Initialized OllamaLLM: model={}, base_url={}", model, base_url);
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens,
            temperature,
        }
    }
}

#[async_trait]
impl ResponseGenerator for OllamaLLM {
    #[instrument(skip(self, turns), fields(model = %self.model, turns = turns.len()))]
    async fn generate(&self, turns: &[Turn]) -> Result<String, VoiceError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(turns),
            stream: false,
            raw: true,
            options: GenerateOptions {
                num_predict: self.max_tokens,
                temperature: self.temperature,
            },
        };

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceError::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Generation(format!("HTTP {status}: {body}")));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Generation(format!("Failed to parse response: {e}")))?;

        debug!("Generated {} chars", result.response.len());
        Ok(result.response.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
