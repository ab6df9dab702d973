use std::sync::Arc;
use tracing::info;
use anyhow::Result;

use crate::agent::generator::ResponseGenerator;
use crate::agent::ollama_llm::OllamaLLM;
use crate::agent::openai_compatible_llm::OpenAICompatibleLLM;
use crate::config::LlmConfig;

/// Factory for creating response generators
pub struct GeneratorFactory;

impl GeneratorFactory {
    /// Create the generator named by `config.provider`.
    ///
    /// Called once at startup; the returned instance is shared by all requests.
    pub fn create(config: &LlmConfig) -> Result<Arc<dyn ResponseGenerator>> {
        info!("Initializing LLM: {}", config.provider);

        match config.provider.as_str() {
            "ollama" | "ollama_llm" => Ok(Arc::new(OllamaLLM::new(
                config.base_url.clone(),
                config.model.clone(),
                config.max_tokens,
                config.temperature,
            ))),
            "openai_compatible" | "openai_compatible_llm" | "openai_llm" | "lmstudio_llm"
            | "mlx_llm" => Ok(Arc::new(OpenAICompatibleLLM::new(
                config.base_url.clone(),
                config.model.clone(),
                config.api_key.clone(),
                config.max_tokens,
                config.temperature,
            ))),
            other => Err(anyhow::anyhow!("Unsupported LLM provider: {}", other)),
        }
    }
}
