use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::store::ConversationStore;
use super::types::{ChatOutcome, Role, Turn};
use crate::agent::ResponseGenerator;
use crate::config::PromptsConfig;
use crate::error::VoiceError;

const MAX_SESSION_ID_LEN: usize = 64;

/// Accept a client-presented session id or mint a new one.
///
/// Ids are opaque bearer tokens; anything outside `[A-Za-z0-9_-]{1,64}` is
/// ignored rather than used as a store key.
pub fn resolve_session_id(presented: Option<&str>) -> String {
    match presented {
        Some(id) if is_valid_session_id(id) => id.to_string(),
        Some(id) => {
            debug!("Ignoring malformed session id ({} bytes)", id.len());
            new_session_id()
        }
        None => new_session_id(),
    }
}

/// Calls `ConversationStore::release` when a turn ends, however it ends
struct SessionRelease<'a> {
    store: &'a dyn ConversationStore,
    session_id: &'a str,
}

impl Drop for SessionRelease<'_> {
    fn drop(&mut self) {
        self.store.release(self.session_id);
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Runs one user utterance through the conversation:
/// seed system turn, append user turn, generate, append reply, persist.
pub struct ChatOrchestrator {
    store: Arc<dyn ConversationStore>,
    generator: Arc<dyn ResponseGenerator>,
    prompts: PromptsConfig,
}

impl ChatOrchestrator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        generator: Arc<dyn ResponseGenerator>,
        prompts: PromptsConfig,
    ) -> Self {
        Self {
            store,
            generator,
            prompts,
        }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Append `user_text` to the session and return the model's reply.
    ///
    /// The session lock is held from read to write, so requests for the same
    /// session are applied one after another. Nothing is stored unless
    /// generation succeeds.
    #[instrument(skip(self, user_text))]
    pub async fn converse(
        &self,
        session_id: &str,
        user_text: &str,
        language: Option<&str>,
    ) -> Result<ChatOutcome, VoiceError> {
        // Declared before the guard so it runs after the lock is released
        let _release = SessionRelease {
            store: self.store.as_ref(),
            session_id,
        };
        let _guard = self.store.lock(session_id).await;

        let mut history = self.store.get(session_id).await;
        if history.first().map(|t| t.role) != Some(Role::System) {
            let system_prompt = self.prompts.for_language(language);
            debug!("Seeding system turn for language {:?}", language);
            history.insert(0, Turn::system(system_prompt));
        }

        history.push(Turn::user(user_text));
        let reply = self.generator.generate(&history).await?;
        history.push(Turn::assistant(reply.clone()));

        self.store.put(session_id, history.clone()).await;
        info!("Session {} now has {} turns", session_id, history.len());

        Ok(ChatOutcome {
            session_id: session_id.to_string(),
            reply,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversations::InMemoryConversationStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes the last user turn and records what it was given
    #[derive(Default)]
    struct EchoGenerator {
        seen: Mutex<Vec<Vec<Turn>>>,
        fail: bool,
    }

    #[async_trait]
    impl ResponseGenerator for EchoGenerator {
        async fn generate(&self, turns: &[Turn]) -> Result<String, VoiceError> {
            self.seen.lock().unwrap().push(turns.to_vec());
            if self.fail {
                return Err(VoiceError::Generation("backend down".to_string()));
            }
            let last = turns.last().map(|t| t.content.clone()).unwrap_or_default();
            Ok(format!("echo: {last}"))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn orchestrator(generator: Arc<EchoGenerator>) -> (ChatOrchestrator, Arc<InMemoryConversationStore>) {
        let store = Arc::new(InMemoryConversationStore::new());
        let orch = ChatOrchestrator::new(store.clone(), generator, PromptsConfig::default());
        (orch, store)
    }

    #[tokio::test]
    async fn first_exchange_seeds_system_turn() {
        let (orch, store) = orchestrator(Arc::new(EchoGenerator::default()));

        let outcome = orch.converse("s1", "hello", None).await.unwrap();

        assert_eq!(outcome.reply, "echo: hello");
        assert_eq!(
            outcome.history,
            vec![
                Turn::system("You are a helpful assistant."),
                Turn::user("hello"),
                Turn::assistant("echo: hello"),
            ]
        );
        assert_eq!(store.get("s1").await, outcome.history);
    }

    #[tokio::test]
    async fn follow_up_extends_history_without_reseeding() {
        let generator = Arc::new(EchoGenerator::default());
        let (orch, _store) = orchestrator(generator.clone());

        orch.converse("s1", "hello", Some("en")).await.unwrap();
        let outcome = orch.converse("s1", "again", Some("zh")).await.unwrap();

        assert_eq!(outcome.history.len(), 5);
        let system_turns = outcome.history.iter().filter(|t| t.role == Role::System).count();
        assert_eq!(system_turns, 1);
        assert_eq!(outcome.history[0].content, "You are a helpful assistant.");

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen[1].len(), 4);
        assert_eq!(seen[1].last(), Some(&Turn::user("again")));
    }

    #[tokio::test]
    async fn language_selects_system_prompt() {
        let (orch, _store) = orchestrator(Arc::new(EchoGenerator::default()));

        let zh = orch.converse("zh-session", "你好", Some("zh")).await.unwrap();
        assert_eq!(zh.history[0].content, "你是一个乐于助人的助手。");

        let fr = orch.converse("fr-session", "bonjour", Some("fr")).await.unwrap();
        assert_eq!(fr.history[0].content, "You are a helpful assistant.");
    }

    #[tokio::test]
    async fn history_without_leading_system_turn_is_repaired() {
        let (orch, store) = orchestrator(Arc::new(EchoGenerator::default()));
        store.put("s1", vec![Turn::user("orphan")]).await;

        let outcome = orch.converse("s1", "next", None).await.unwrap();

        assert_eq!(outcome.history[0].role, Role::System);
        assert_eq!(outcome.history[1], Turn::user("orphan"));
        assert_eq!(outcome.history.len(), 4);
    }

    #[tokio::test]
    async fn failed_generation_persists_nothing() {
        let generator = Arc::new(EchoGenerator {
            fail: true,
            ..Default::default()
        });
        let (orch, store) = orchestrator(generator);

        let err = orch.converse("s1", "hello", None).await.unwrap_err();

        assert!(matches!(err, VoiceError::Generation(_)));
        assert!(store.get("s1").await.is_empty());
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn failed_turns_leave_no_lock_entries() {
        let generator = Arc::new(EchoGenerator {
            fail: true,
            ..Default::default()
        });
        let (orch, store) = orchestrator(generator);

        for _ in 0..100 {
            let session_id = resolve_session_id(None);
            assert!(orch.converse(&session_id, "hi", None).await.is_err());
        }

        assert_eq!(store.session_count(), 0);
        assert_eq!(store.lock_count(), 0);
    }

    #[tokio::test]
    async fn lock_entries_track_stored_sessions() {
        let (orch, store) = orchestrator(Arc::new(EchoGenerator::default()));

        orch.converse("s1", "hello", None).await.unwrap();
        orch.converse("s1", "again", None).await.unwrap();
        orch.converse("s2", "hello", None).await.unwrap();

        assert_eq!(store.session_count(), 2);
        assert_eq!(store.lock_count(), store.session_count());
    }

    #[test]
    fn presented_session_id_is_reused() {
        assert_eq!(resolve_session_id(Some("abc-123_X")), "abc-123_X");
    }

    #[test]
    fn missing_or_malformed_session_id_is_replaced() {
        let fresh = resolve_session_id(None);
        assert!(Uuid::parse_str(&fresh).is_ok());

        let too_long = "x".repeat(65);
        for bad in ["", "has space", "semi;colon", too_long.as_str()] {
            let id = resolve_session_id(Some(bad));
            assert_ne!(id, bad);
            assert!(Uuid::parse_str(&id).is_ok());
        }
    }
}
