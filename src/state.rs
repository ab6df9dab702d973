use std::sync::Arc;
use std::time::Duration;

use crate::agent::{GeneratorFactory, ResponseGenerator};
use crate::asr::{AsrServiceClient, AudioNormalizer, RecognizerFactory, SpeechRecognizer};
use crate::config::Config;
use crate::conversations::{ChatOrchestrator, ConversationStore, InMemoryConversationStore};

/// Shared state of the app server
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub asr_service: Arc<AsrServiceClient>,
    pub orchestrator: Arc<ChatOrchestrator>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let generator = GeneratorFactory::create(&config.llm)?;
        let store = Arc::new(InMemoryConversationStore::new());
        Self::with_components(config, store, generator)
    }

    /// Build with an explicit store and generator
    pub fn with_components(
        config: Config,
        store: Arc<dyn ConversationStore>,
        generator: Arc<dyn ResponseGenerator>,
    ) -> anyhow::Result<Self> {
        let asr_service = Arc::new(AsrServiceClient::new(
            config.app_server.asr_service_url.clone(),
            Duration::from_secs(config.app_server.asr_timeout_secs),
        )?);
        let orchestrator = Arc::new(ChatOrchestrator::new(
            store,
            generator,
            config.prompts.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            asr_service,
            orchestrator,
        })
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        self.orchestrator.store()
    }

    pub fn legacy_status_codes(&self) -> bool {
        self.config.app_server.legacy_status_codes
    }
}

/// Shared state of the ASR server
#[derive(Clone)]
pub struct AsrState {
    pub normalizer: Arc<AudioNormalizer>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub legacy_status_codes: bool,
}

impl AsrState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let recognizer = RecognizerFactory::create(&config.asr_server.recognizer)?;
        Ok(Self::with_recognizer(config, recognizer))
    }

    pub fn with_recognizer(config: &Config, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self {
            normalizer: Arc::new(AudioNormalizer::new(config.asr_server.ffmpeg_path.clone())),
            recognizer,
            legacy_status_codes: config.asr_server.legacy_status_codes,
        }
    }
}
