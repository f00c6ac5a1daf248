//! Conversation-state records
//!
//! One record per turn. Composite fields (intent, entities, slots,
//! events, button, synonym dictionary, response) are opaque
//! JSON-encoded strings: the store round-trips them byte for byte and
//! never interprets them.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A snapshot of one conversation after one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Monotonic record id, assigned by the store on append
    #[serde(default)]
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    pub version: String,
    /// JSON-encoded intent
    pub intent: String,
    /// JSON-encoded entity list
    pub entities: String,
    /// JSON-encoded slot map
    pub slots: String,
    /// JSON-encoded pending effects
    pub events: String,
    /// JSON-encoded pending button options, when a prompt is open
    pub button: Option<String>,
    /// JSON-encoded synonym table of the pending button
    pub synonym_dict: Option<String>,
    pub loop_stack: i64,
    /// JSON-encoded last response
    pub response: Option<String>,
    /// Unix timestamp (seconds)
    pub timestamp: f64,
}

impl ConversationRecord {
    /// Current unix timestamp for a freshly exported record.
    pub fn now() -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }
}
