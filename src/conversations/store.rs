use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::types::Turn;

/// Held for the duration of a read-modify-write on one session
pub type SessionGuard = OwnedMutexGuard<()>;

/// Storage for per-session chat histories.
///
/// `get`/`put` are plain reads and writes. Callers that read, extend and
/// write back a history take `lock` first so concurrent requests for the
/// same session cannot overwrite each other.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Turns of a session, empty if the session is unknown
    async fn get(&self, session_id: &str) -> Vec<Turn>;

    /// Replace the turns of a session
    async fn put(&self, session_id: &str, turns: Vec<Turn>);

    /// Exclusive access to one session id
    async fn lock(&self, session_id: &str) -> SessionGuard;

    /// Forget the lock of a session that ended up with no history.
    /// Called after the guard from `lock` is dropped.
    fn release(&self, session_id: &str);

    /// Number of sessions with stored history
    fn session_count(&self) -> usize;
}

/// Process-local store; histories live until the process exits.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    histories: DashMap<String, Vec<Turn>>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lock entries currently kept
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, session_id: &str) -> Vec<Turn> {
        self.histories
            .get(session_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    async fn put(&self, session_id: &str, turns: Vec<Turn>) {
        debug!("Storing {} turns for session {}", turns.len(), session_id);
        self.histories.insert(session_id.to_string(), turns);
    }

    async fn lock(&self, session_id: &str) -> SessionGuard {
        // Clone the Arc out so the map shard is not held across the await
        let mutex = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .value()
            .clone();
        mutex.lock_owned().await
    }

    fn release(&self, session_id: &str) {
        if self.histories.contains_key(session_id) {
            return;
        }
        // Waiters hold their own clone of the Arc, so a count of one means
        // nobody is queued on this lock
        let removed = self
            .locks
            .remove_if(session_id, |_, mutex| Arc::strong_count(mutex) == 1);
        if removed.is_some() {
            debug!("Dropped lock of empty session {}", session_id);
        }
    }

    fn session_count(&self) -> usize {
        self.histories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let store = InMemoryConversationStore::new();
        assert!(store.get("nope").await.is_empty());
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn put_replaces_previous_turns() {
        let store = InMemoryConversationStore::new();
        store.put("s1", vec![Turn::system("a")]).await;
        store
            .put("s1", vec![Turn::system("a"), Turn::user("b")])
            .await;

        assert_eq!(store.get("s1").await.len(), 2);
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemoryConversationStore::new();
        store.put("s1", vec![Turn::user("one")]).await;
        store.put("s2", vec![Turn::user("two")]).await;

        assert_eq!(store.get("s1").await, vec![Turn::user("one")]);
        assert_eq!(store.get("s2").await, vec![Turn::user("two")]);
    }

    #[tokio::test]
    async fn lock_serializes_same_session() {
        let store = Arc::new(InMemoryConversationStore::new());

        let guard = store.lock("s1").await;
        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let _guard = store.lock("s1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender acquires the lock after release")
            .unwrap();
    }

    #[tokio::test]
    async fn release_forgets_lock_of_empty_session() {
        let store = InMemoryConversationStore::new();

        drop(store.lock("empty").await);
        store.release("empty");

        assert_eq!(store.lock_count(), 0);
    }

    #[tokio::test]
    async fn release_keeps_lock_of_stored_session() {
        let store = InMemoryConversationStore::new();

        let guard = store.lock("s1").await;
        store.put("s1", vec![Turn::system("a")]).await;
        drop(guard);
        store.release("s1");

        assert_eq!(store.lock_count(), 1);
        assert_eq!(store.lock_count(), store.session_count());
    }

    #[tokio::test]
    async fn release_keeps_lock_with_waiters() {
        let store = Arc::new(InMemoryConversationStore::new());

        let guard = store.lock("busy").await;
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let _guard = store.lock("busy").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.release("busy");
        assert_eq!(store.lock_count(), 1);

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn lock_does_not_block_other_sessions() {
        let store = InMemoryConversationStore::new();
        let _guard = store.lock("s1").await;

        let other = tokio::time::timeout(Duration::from_millis(100), store.lock("s2")).await;
        assert!(other.is_ok());
    }
}
