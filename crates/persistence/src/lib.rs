//! Append-only conversation log
//!
//! Every turn appends one snapshot of the conversation state; the
//! latest record per user is the durable arbiter a cold start rebuilds
//! from. Two backends exist behind the same trait:
//!
//! - [`SqliteConversationStore`] — durable, survives process restarts
//! - [`InMemoryConversationStore`] — tests and persistence-disabled
//!   deployments

pub mod error;
pub mod memory;
pub mod record;
pub mod sqlite;

pub use error::PersistenceError;
pub use memory::InMemoryConversationStore;
pub use record::ConversationRecord;
pub use sqlite::SqliteConversationStore;

use async_trait::async_trait;

/// Store for conversation-state snapshots, one record per turn.
///
/// Records are keyed by a monotonic id; all list queries return records
/// in descending id order (most recent first). Writes are serialized by
/// the implementation.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append one record; returns the assigned record id.
    async fn append(&self, record: &ConversationRecord) -> Result<i64, PersistenceError>;

    /// The latest snapshot for a user, if any.
    async fn latest(&self, user_id: &str) -> Result<Option<ConversationRecord>, PersistenceError>;

    /// The last `limit` records for a user, most recent first.
    async fn history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, PersistenceError>;

    /// The last `limit` records across all users, most recent first.
    async fn recent(&self, limit: usize) -> Result<Vec<ConversationRecord>, PersistenceError>;

    /// The latest record of each user, limited to `limit` users, most
    /// recently active first.
    async fn latest_per_user(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, PersistenceError>;
}
