use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use anyhow::Result;

/// Environment variable prefix for overrides, e.g. `VOICE__LLM__MODEL=qwen3:4b`
const ENV_PREFIX: &str = "VOICE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app_server: AppServerConfig,
    pub asr_server: AsrServerConfig,
    pub llm: LlmConfig,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub asr_service_url: String,
    pub asr_timeout_secs: u64,
    /// Answer errors with HTTP 200 and an `error` body
    pub legacy_status_codes: bool,
}

impl Default for AppServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 8080,
            allowed_origins: vec!["http://localhost:8000".to_string()],
            asr_service_url: "http://127.0.0.1:8081".to_string(),
            asr_timeout_secs: 60,
            legacy_status_codes: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrServerConfig {
    pub host: String,
    pub port: u16,
    pub ffmpeg_path: String,
    pub legacy_status_codes: bool,
    pub recognizer: RecognizerConfig,
}

impl Default for AsrServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 8081,
            ffmpeg_path: "ffmpeg".to_string(),
            legacy_status_codes: false,
            recognizer: RecognizerConfig::default(),
        }
    }
}

/// Speech recognizer backend used by the ASR server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub provider: String, // "whisper_cli" or "whisper_http"
    // whisper_cli
    pub executable: String,
    pub model_path: String,
    pub threads: u32,
    // whisper_http
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            provider: "whisper_cli".to_string(),
            executable: "whisper-cli".to_string(),
            model_path: "models/ggml-large-v3.bin".to_string(),
            threads: 4,
            base_url: "http://127.0.0.1:8000/v1".to_string(),
            model: "whisper-large-v3".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String, // "ollama" or "openai_compatible"
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "qwen3:4b".to_string(),
            api_key: None,
            max_tokens: 256,
            temperature: None,
        }
    }
}

/// System prompts seeded into new conversations, keyed by language code
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub default: String,
    pub by_language: HashMap<String, String>,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        let mut by_language = HashMap::new();
        by_language.insert("en".to_string(), default_system_prompt());
        by_language.insert("zh".to_string(), "你是一个乐于助人的助手。".to_string());
        Self {
            default: default_system_prompt(),
            by_language,
        }
    }
}

impl PromptsConfig {
    /// Pick the system prompt for a detected or declared language.
    ///
    /// Region subtags are ignored (`zh-CN` -> `zh`); unknown or absent codes
    /// fall back to the generic prompt.
    pub fn for_language(&self, lang_code: Option<&str>) -> &str {
        lang_code
            .map(primary_language)
            .and_then(|code| self.by_language.get(&code))
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

fn primary_language(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}

impl Config {
    /// Load configuration from an optional file, then environment overrides.
    ///
    /// Without an explicit path, `conf.{yaml,toml,json}` in the working
    /// directory is used when present.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::with_name(p).required(true),
            None => config::File::with_name("conf").required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("app_server.allowed_origins"),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    /// Load using `CONFIG_PATH` when set.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").ok();
        Self::load(path.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = Config::default();
        assert_eq!(config.app_server.port, 8080);
        assert_eq!(config.asr_server.port, 8081);
        assert_eq!(config.app_server.asr_timeout_secs, 60);
        assert_eq!(config.llm.max_tokens, 256);
        assert_eq!(
            config.app_server.allowed_origins,
            vec!["http://localhost:8000".to_string()]
        );
    }

    #[test]
    fn prompt_lookup_by_language() {
        let prompts = PromptsConfig::default();
        assert_eq!(prompts.for_language(Some("en")), "You are a helpful assistant.");
        assert_eq!(prompts.for_language(Some("zh")), "你是一个乐于助人的助手。");
        assert_eq!(prompts.for_language(Some("zh-CN")), "你是一个乐于助人的助手。");
        assert_eq!(prompts.for_language(Some("ZH")), "你是一个乐于助人的助手。");
    }

    #[test]
    fn unknown_language_uses_generic_prompt() {
        let prompts = PromptsConfig::default();
        assert_eq!(prompts.for_language(Some("fr")), "You are a helpful assistant.");
        assert_eq!(prompts.for_language(Some("")), "You are a helpful assistant.");
        assert_eq!(prompts.for_language(None), "You are a helpful assistant.");
    }

    #[test]
    fn loads_partial_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "llm:\n  provider: openai_compatible\n  model: test-model\napp_server:\n  port: 9090\n  legacy_status_codes: true"
        )
        .unwrap();

        let config = Config::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.llm.provider, "openai_compatible");
        assert_eq!(config.llm.model, "test-model");
        assert_eq!(config.llm.max_tokens, 256);
        assert_eq!(config.app_server.port, 9090);
        assert!(config.app_server.legacy_status_codes);
        assert_eq!(config.asr_server.recognizer.provider, "whisper_cli");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(Config::load(Some("/nonexistent/voice-conf.yaml")).is_err());
    }
}
