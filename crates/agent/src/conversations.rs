//! Bounded working set of conversations
//!
//! Keeps up to `user_limit` conversation states in memory, evicting the
//! least frequently used entry (insertion order breaks ties). Misses
//! load the latest snapshot from the conversation log; saves append to
//! it. Each state sits behind its own async mutex so reductions on one
//! conversation are serialized while different users run in parallel.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use flowbot_core::Domain;
use flowbot_persistence::ConversationStore;

use crate::state::ConversationState;

struct CacheEntry {
    state: Arc<tokio::sync::Mutex<ConversationState>>,
    frequency: u64,
    inserted: u64,
}

/// The per-user conversation cache and persistence bridge.
pub struct UserConversations {
    store: Arc<dyn ConversationStore>,
    domain: Arc<Domain>,
    user_limit: usize,
    version: String,
    entries: Mutex<HashMap<String, CacheEntry>>,
    insertions: Mutex<u64>,
}

impl UserConversations {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        domain: Arc<Domain>,
        user_limit: usize,
        version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            domain,
            user_limit: user_limit.max(1),
            version: version.into(),
            entries: Mutex::new(HashMap::new()),
            insertions: Mutex::new(0),
        }
    }

    /// Fetch (or load, or create) the conversation state of a user.
    ///
    /// The returned handle owns the single-writer lock for that
    /// conversation: hold it for the duration of one turn.
    pub async fn get(
        &self,
        user_id: &str,
        user_name: &str,
    ) -> Arc<tokio::sync::Mutex<ConversationState>> {
        if let Some(state) = self.hit(user_id) {
            return state;
        }

        // Miss: consult the store outside the map lock.
        let state = match self.store.latest(user_id).await {
            Ok(Some(record)) => match ConversationState::from_record(&record, &self.domain) {
                Ok(state) => {
                    tracing::debug!(user_id, record_id = record.id, "restored conversation");
                    state
                }
                Err(error) => {
                    tracing::warn!(user_id, %error, "stored conversation unusable, starting fresh");
                    ConversationState::fresh(user_id, user_name, &self.version)
                }
            },
            Ok(None) => ConversationState::fresh(user_id, user_name, &self.version),
            Err(error) => {
                tracing::warn!(user_id, %error, "conversation store unavailable, starting fresh");
                ConversationState::fresh(user_id, user_name, &self.version)
            }
        };

        self.insert(user_id, state)
    }

    /// Append the user's current state to the conversation log.
    ///
    /// Persistence failures are logged, never propagated: the in-memory
    /// state stays authoritative and the next successful save
    /// supersedes.
    pub async fn save(&self, user_id: &str) {
        let state = {
            let entries = self.entries.lock();
            entries.get(user_id).map(|entry| entry.state.clone())
        };

        let Some(state) = state else {
            tracing::warn!(user_id, "save requested for a user not in the working set");
            return;
        };

        let record = { state.lock().await.export() };
        match record {
            Ok(record) => {
                if let Err(error) = self.store.append(&record).await {
                    tracing::warn!(user_id, %error, "failed to persist conversation state");
                }
            }
            Err(error) => {
                tracing::warn!(user_id, %error, "failed to export conversation state");
            }
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.lock().contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn hit(&self, user_id: &str) -> Option<Arc<tokio::sync::Mutex<ConversationState>>> {
        let mut entries = self.entries.lock();
        entries.get_mut(user_id).map(|entry| {
            entry.frequency += 1;
            entry.state.clone()
        })
    }

    fn insert(
        &self,
        user_id: &str,
        state: ConversationState,
    ) -> Arc<tokio::sync::Mutex<ConversationState>> {
        let mut entries = self.entries.lock();

        // Another task may have loaded the same user meanwhile.
        if let Some(entry) = entries.get_mut(user_id) {
            entry.frequency += 1;
            return entry.state.clone();
        }

        if entries.len() >= self.user_limit {
            if let Some(evicted) = entries
                .iter()
                .min_by_key(|(_, entry)| (entry.frequency, entry.inserted))
                .map(|(user, _)| user.clone())
            {
                tracing::debug!(user_id = %evicted, "evicting least used conversation");
                entries.remove(&evicted);
            }
        }

        let inserted = {
            let mut insertions = self.insertions.lock();
            *insertions += 1;
            *insertions
        };
        let state = Arc::new(tokio::sync::Mutex::new(state));
        entries.insert(
            user_id.to_string(),
            CacheEntry {
                state: state.clone(),
                frequency: 1,
                inserted,
            },
        );
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbot_persistence::InMemoryConversationStore;

    fn domain() -> Arc<Domain> {
        Arc::new(
            Domain::new(
                vec!["default".into(), "greet".into()],
                vec![],
                vec!["latest_question".into()],
            )
            .unwrap(),
        )
    }

    fn conversations(user_limit: usize) -> UserConversations {
        UserConversations::new(
            Arc::new(InMemoryConversationStore::new()),
            domain(),
            user_limit,
            "v0.1",
        )
    }

    #[tokio::test]
    async fn test_creates_fresh_state_on_miss() {
        let conversations = conversations(10);
        let state = conversations.get("alice", "Alice").await;
        let state = state.lock().await;
        assert_eq!(state.user_id, "alice");
        assert_eq!(state.intent.name, "default");
        assert_eq!(state.loop_stack, 0);
    }

    #[tokio::test]
    async fn test_hit_returns_same_state() {
        let conversations = conversations(10);
        {
            let state = conversations.get("alice", "Alice").await;
            state.lock().await.slots.insert("latest_question", Some("greet".to_string()));
        }
        let state = conversations.get("alice", "Alice").await;
        assert_eq!(state.lock().await.slots.get("latest_question"), Some("greet"));
    }

    #[tokio::test]
    async fn test_eviction_prefers_lowest_frequency() {
        let conversations = conversations(2);
        conversations.get("alice", "Alice").await;
        conversations.get("bob", "Bob").await;
        // alice becomes more frequent
        conversations.get("alice", "Alice").await;

        conversations.get("carol", "Carol").await;
        assert!(conversations.contains("alice"));
        assert!(!conversations.contains("bob"));
        assert!(conversations.contains("carol"));
        assert_eq!(conversations.len(), 2);
    }

    #[tokio::test]
    async fn test_eviction_ties_break_by_insertion_order() {
        let conversations = conversations(2);
        conversations.get("alice", "Alice").await;
        conversations.get("bob", "Bob").await;

        conversations.get("carol", "Carol").await;
        assert!(!conversations.contains("alice"));
        assert!(conversations.contains("bob"));
    }

    #[tokio::test]
    async fn test_save_and_reload_round_trip() {
        let store = Arc::new(InMemoryConversationStore::new());
        let conversations =
            UserConversations::new(store.clone(), domain(), 1, "v0.1");

        {
            let state = conversations.get("alice", "Alice").await;
            state.lock().await.slots.insert("latest_question", Some("greet".to_string()));
        }
        conversations.save("alice").await;

        // evict alice by filling the single cache slot
        conversations.get("bob", "Bob").await;
        assert!(!conversations.contains("alice"));

        let state = conversations.get("alice", "Alice").await;
        assert_eq!(state.lock().await.slots.get("latest_question"), Some("greet"));
    }
}
