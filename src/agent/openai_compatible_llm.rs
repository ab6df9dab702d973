use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::generator::ResponseGenerator;
use crate::conversations::Turn;
use crate::error::VoiceError;

/// OpenAI compatible chat backend (LM Studio, vLLM, mlx_lm.server, ...).
/// Turns are sent as chat messages; the server applies the model's chat template.
#[derive(Debug, Clone)]
pub struct OpenAICompatibleLLM {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAICompatibleLLM {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        max_tokens: u32,
        temperature: Option<f32>,
    ) -> Self {
        info!(
            "Initialized OpenAICompatibleLLM: model={}, base_url={}",
            model, base_url
        );
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key: api_key.filter(|k| !k.is_empty()),
            max_tokens,
            temperature,
        }
    }
}

#[async_trait]
impl ResponseGenerator for OpenAICompatibleLLM {
    #[instrument(skip(self, turns), fields(model = %self.model, turns = turns.len()))]
    async fn generate(&self, turns: &[Turn]) -> Result<String, VoiceError> {
        let request = ChatRequest {
            model: &self.model,
            messages: turns,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| VoiceError::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Generation(format!("HTTP {status}: {body}")));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Generation(format!("Failed to parse response: {e}")))?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| VoiceError::Generation("Response contained no choices".to_string()))?;

        debug!("Generated {} chars", content.len());
        Ok(content.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
