//! Runtime conversation values
//!
//! These are the values a conversation carries between turns: the latest
//! classified intent, the entities extracted from the last utterance, the
//! slot store, and the outbound message produced by the driver.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The fallback intent every domain must declare.
pub const DEFAULT_INTENT: &str = "default";

/// Reserved slot tracking which slot is currently being solicited.
pub const REQUEST_SLOT: &str = "request_slot";

/// Priority assigned to intents resolved through the flow configuration.
pub const RESOLVED_PRIORITY: i32 = 1;

/// Priority of the fallback intent.
pub const FALLBACK_PRIORITY: i32 = 0;

/// The classified intent of the latest user utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Intent name
    pub name: String,
    /// Confidence per candidate intent, in [0, 1]
    #[serde(default)]
    pub intent_ranking: HashMap<String, f32>,
    /// Dispatch priority (1 for resolved intents, 0 for the fallback)
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    RESOLVED_PRIORITY
}

impl Intent {
    /// A resolved intent with an empty ranking.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            intent_ranking: HashMap::new(),
            priority: RESOLVED_PRIORITY,
        }
    }

    /// The fallback intent.
    pub fn fallback() -> Self {
        Self {
            name: DEFAULT_INTENT.to_string(),
            intent_ranking: HashMap::new(),
            priority: FALLBACK_PRIORITY,
        }
    }

    /// Candidate intents ordered by descending confidence.
    ///
    /// Ties break alphabetically so the ordering is stable.
    pub fn ranked(&self) -> Vec<(&str, f32)> {
        let mut ranked: Vec<(&str, f32)> = self
            .intent_ranking
            .iter()
            .map(|(name, score)| (name.as_str(), *score))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked
    }
}

impl Default for Intent {
    fn default() -> Self {
        Self::fallback()
    }
}

/// A named span extracted from a user utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity type name (must be declared in the domain)
    pub entity_name: String,
    /// Extracted surface text
    pub text: String,
    /// Character span in the utterance, if the extractor reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<(usize, usize)>,
    /// Canonical synonym reported by the extractor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synonym: Option<String>,
}

impl Entity {
    pub fn new(entity_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            text: text.into(),
            position: None,
            synonym: None,
        }
    }
}

/// Slot assignments produced by set-slot effects: `None` clears a slot.
pub type SlotAssignments = HashMap<String, Option<String>>;

/// The per-conversation slot store.
///
/// A slot is "set" when it is present with a non-null value. Assignments
/// merge in; an explicit null clears the slot while keeping it present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slots(HashMap<String, Option<String>>);

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value of a set slot, or `None` for unset/cleared/absent slots.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.as_deref())
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        self.0.insert(name.into(), value);
    }

    /// Merge a set of assignments in, replacing existing entries.
    pub fn apply(&mut self, assignments: &SlotAssignments) {
        for (name, value) in assignments {
            self.0.insert(name.clone(), value.clone());
        }
    }

    /// Names of all slots currently set (present and non-null).
    pub fn set_names(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|_| name.as_str()))
            .collect()
    }

    /// All slot names present in the store, set or cleared.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, Option<String>>> for Slots {
    fn from(map: HashMap<String, Option<String>>) -> Self {
        Self(map)
    }
}

/// The channel-agnostic outbound message produced by one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageOutput {
    /// Message body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Selectable option titles, when the turn ends on a button prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<Vec<String>>,
}

impl MessageOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            button: None,
        }
    }

    pub fn buttons(text: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            text: Some(text.into()),
            button: Some(options),
        }
    }
}
