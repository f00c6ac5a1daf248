//! In-memory conversation store
//!
//! Used by tests and by deployments that run with persistence disabled.
//! Nothing survives a restart.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;

use crate::error::PersistenceError;
use crate::record::ConversationRecord;
use crate::ConversationStore;

/// Append-only store backed by a vector.
#[derive(Default)]
pub struct InMemoryConversationStore {
    records: RwLock<Vec<ConversationRecord>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, record: &ConversationRecord) -> Result<i64, PersistenceError> {
        let mut records = self.records.write();
        let id = records.len() as i64 + 1;
        let mut record = record.clone();
        record.id = id;
        records.push(record);
        Ok(id)
    }

    async fn latest(&self, user_id: &str) -> Result<Option<ConversationRecord>, PersistenceError> {
        Ok(self
            .records
            .read()
            .iter()
            .rev()
            .find(|record| record.user_id == user_id)
            .cloned())
    }

    async fn history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, PersistenceError> {
        Ok(self
            .records
            .read()
            .iter()
            .rev()
            .filter(|record| record.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ConversationRecord>, PersistenceError> {
        Ok(self
            .records
            .read()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn latest_per_user(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, PersistenceError> {
        let records = self.records.read();
        let mut seen = HashSet::new();
        let mut latest = Vec::new();
        for record in records.iter().rev() {
            if seen.insert(record.user_id.clone()) {
                latest.push(record.clone());
                if latest.len() >= limit {
                    break;
                }
            }
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: &str) -> ConversationRecord {
        ConversationRecord {
            id: 0,
            user_id: user_id.to_string(),
            user_name: "anonymous".to_string(),
            version: "v0.1".to_string(),
            intent: "{}".to_string(),
            entities: "[]".to_string(),
            slots: "{}".to_string(),
            events: "{}".to_string(),
            button: None,
            synonym_dict: None,
            loop_stack: 0,
            response: None,
            timestamp: ConversationRecord::now(),
        }
    }

    #[tokio::test]
    async fn test_append_and_latest() {
        let store = InMemoryConversationStore::new();
        let first = store.append(&record("alice")).await.unwrap();
        let second = store.append(&record("alice")).await.unwrap();
        assert!(second > first);

        let latest = store.latest("alice").await.unwrap().unwrap();
        assert_eq!(latest.id, second);
    }

    #[tokio::test]
    async fn test_latest_per_user_dedupes() {
        let store = InMemoryConversationStore::new();
        store.append(&record("alice")).await.unwrap();
        store.append(&record("bob")).await.unwrap();
        store.append(&record("alice")).await.unwrap();

        let users = store.latest_per_user(10).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user_id, "alice");
        assert_eq!(users[1].user_id, "bob");
    }
}
