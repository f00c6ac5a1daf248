//! SQLite-backed conversation store
//!
//! A single connection behind a mutex; the mutex doubles as the write
//! serialization the store must provide. The schema is created on open.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Arc;

use crate::error::PersistenceError;
use crate::record::ConversationRecord;
use crate::ConversationStore;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS chat_state (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    user_name TEXT NOT NULL,
    version TEXT NOT NULL,
    intent TEXT NOT NULL,
    entities TEXT NOT NULL,
    slots TEXT NOT NULL,
    events TEXT NOT NULL,
    button TEXT,
    synonym_dict TEXT,
    loop_stack INTEGER NOT NULL,
    response TEXT,
    timestamp REAL NOT NULL
)";

const USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_chat_state_user ON chat_state (user_id, id DESC)";

const COLUMNS: &str = "id, user_id, user_name, version, intent, entities, slots, events, \
                       button, synonym_dict, loop_stack, response, timestamp";

/// Durable conversation store on SQLite.
#[derive(Clone)]
pub struct SqliteConversationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteConversationStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| PersistenceError::Connection(e.to_string()))?;
        tracing::info!(path = %path.as_ref().display(), "Opened conversation store");
        Self::with_connection(conn)
    }

    /// An in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PersistenceError::Connection(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute(SCHEMA, [])
            .map_err(|e| PersistenceError::Schema(e.to_string()))?;
        conn.execute(USER_INDEX, [])
            .map_err(|e| PersistenceError::Schema(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn query_records(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<ConversationRecord>, PersistenceError> {
        let conn = self.conn.lock();
        let mut statement = conn.prepare(sql)?;
        let rows = statement.query_map(params, record_from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationRecord> {
    Ok(ConversationRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        user_name: row.get(2)?,
        version: row.get(3)?,
        intent: row.get(4)?,
        entities: row.get(5)?,
        slots: row.get(6)?,
        events: row.get(7)?,
        button: row.get(8)?,
        synonym_dict: row.get(9)?,
        loop_stack: row.get(10)?,
        response: row.get(11)?,
        timestamp: row.get(12)?,
    })
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn append(&self, record: &ConversationRecord) -> Result<i64, PersistenceError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO chat_state (user_id, user_name, version, intent, entities, slots, \
             events, button, synonym_dict, loop_stack, response, timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.user_id,
                record.user_name,
                record.version,
                record.intent,
                record.entities,
                record.slots,
                record.events,
                record.button,
                record.synonym_dict,
                record.loop_stack,
                record.response,
                record.timestamp,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn latest(&self, user_id: &str) -> Result<Option<ConversationRecord>, PersistenceError> {
        let records = self.query_records(
            &format!(
                "SELECT {COLUMNS} FROM chat_state WHERE user_id = ?1 ORDER BY id DESC LIMIT 1"
            ),
            &[&user_id as &dyn rusqlite::ToSql],
        )?;
        Ok(records.into_iter().next())
    }

    async fn history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, PersistenceError> {
        let limit = limit as i64;
        self.query_records(
            &format!(
                "SELECT {COLUMNS} FROM chat_state WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2"
            ),
            &[&user_id as &dyn rusqlite::ToSql, &limit],
        )
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ConversationRecord>, PersistenceError> {
        let limit = limit as i64;
        self.query_records(
            &format!("SELECT {COLUMNS} FROM chat_state ORDER BY id DESC LIMIT ?1"),
            &[&limit as &dyn rusqlite::ToSql],
        )
    }

    async fn latest_per_user(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, PersistenceError> {
        let limit = limit as i64;
        self.query_records(
            &format!(
                "SELECT {COLUMNS} FROM chat_state WHERE id IN \
                 (SELECT MAX(id) FROM chat_state GROUP BY user_id) \
                 ORDER BY id DESC LIMIT ?1"
            ),
            &[&limit as &dyn rusqlite::ToSql],
        )
    }
}
