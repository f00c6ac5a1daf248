//! Per-user conversation state
//!
//! The running state of one dialogue: the latest intent and entities,
//! the slot store, the pending effects, the open button prompt (if
//! any), the recursion counter and the last response. States are
//! created lazily, mutated only inside the driver during a single turn,
//! and exported to the conversation log after each turn.

use flowbot_core::{Domain, Entity, Intent, MessageOutput, Slots};
use flowbot_flow::{ButtonBinding, ButtonBindings, EventOutput};
use flowbot_persistence::ConversationRecord;

use crate::controller::LOOP_MAX;
use crate::error::AgentError;

/// The running state of one user's conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    pub user_id: String,
    pub user_name: String,
    pub version: String,
    /// Latest classified (or triggered) intent
    pub intent: Intent,
    /// Entities of the latest utterance
    pub entities: Vec<Entity>,
    /// Slot store
    pub slots: Slots,
    /// Pending effects carried into the next reduction
    pub events: EventOutput,
    /// Open button prompt awaiting the user's choice
    pub button: Option<ButtonBindings>,
    /// Recursion counter of the current turn
    pub loop_stack: u32,
    /// Last response sent to the user
    pub response: Option<MessageOutput>,
}

impl ConversationState {
    /// A fresh state for a user never seen before.
    pub fn fresh(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            version: version.into(),
            intent: Intent::fallback(),
            entities: Vec::new(),
            slots: Slots::new(),
            events: EventOutput::new(),
            button: None,
            loop_stack: 0,
            response: None,
        }
    }

    /// Check the state invariants against the domain.
    pub fn validate(&self, domain: &Domain) -> Result<(), AgentError> {
        let fail = |message: String| AgentError::InvalidState {
            user_id: self.user_id.clone(),
            message,
        };

        if !domain.has_intent(&self.intent.name) {
            return Err(fail(format!(
                "intent `{}` is not an available intent",
                self.intent.name
            )));
        }
        for name in self.intent.intent_ranking.keys() {
            if !domain.has_intent(name) {
                return Err(fail(format!("ranked intent `{name}` is not available")));
            }
        }
        for entity in &self.entities {
            if !domain.has_entity(&entity.entity_name) {
                return Err(fail(format!(
                    "entity `{}` is not an available entity",
                    entity.entity_name
                )));
            }
        }
        for slot in self.slots.names() {
            if !domain.has_slot(slot) {
                return Err(fail(format!("slot `{slot}` is not an available slot")));
            }
        }
        if self.loop_stack > LOOP_MAX {
            return Err(fail(format!(
                "loop_stack {} exceeds the bound {LOOP_MAX}",
                self.loop_stack
            )));
        }
        if let Some(bindings) = &self.button {
            for binding in &bindings.options {
                binding
                    .trigger
                    .validate(domain, &format!("stored button `{}`", binding.title))
                    .map_err(|e| fail(e.to_string()))?;
            }
            for title in bindings.synonyms.values() {
                if !bindings.options.iter().any(|b| &b.title == title) {
                    return Err(fail(format!(
                        "synonym target `{title}` is not a button title"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Export a snapshot for the conversation log.
    pub fn export(&self) -> Result<ConversationRecord, AgentError> {
        let encode_err = |e: serde_json::Error| AgentError::Encode(e.to_string());

        let (button, synonym_dict) = match &self.button {
            Some(bindings) => (
                Some(serde_json::to_string(&bindings.options).map_err(encode_err)?),
                Some(serde_json::to_string(&bindings.synonyms).map_err(encode_err)?),
            ),
            None => (None, None),
        };
        let response = self
            .response
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(encode_err)?;

        Ok(ConversationRecord {
            id: 0,
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
            version: self.version.clone(),
            intent: serde_json::to_string(&self.intent).map_err(encode_err)?,
            entities: serde_json::to_string(&self.entities).map_err(encode_err)?,
            slots: serde_json::to_string(&self.slots).map_err(encode_err)?,
            events: serde_json::to_string(&self.events).map_err(encode_err)?,
            button,
            synonym_dict,
            loop_stack: self.loop_stack as i64,
            response,
            timestamp: ConversationRecord::now(),
        })
    }

    /// Rebuild a state from a stored snapshot and validate it.
    pub fn from_record(record: &ConversationRecord, domain: &Domain) -> Result<Self, AgentError> {
        let decode_err = |e: serde_json::Error| AgentError::Decode(e.to_string());

        let button = match &record.button {
            Some(encoded) => {
                let options: Vec<ButtonBinding> =
                    serde_json::from_str(encoded).map_err(decode_err)?;
                let synonyms = match &record.synonym_dict {
                    Some(encoded) => serde_json::from_str(encoded).map_err(decode_err)?,
                    None => Default::default(),
                };
                Some(ButtonBindings { options, synonyms })
            }
            None => None,
        };
        let response = record
            .response
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(decode_err)?;

        let state = Self {
            user_id: record.user_id.clone(),
            user_name: record.user_name.clone(),
            version: record.version.clone(),
            intent: serde_json::from_str(&record.intent).map_err(decode_err)?,
            entities: serde_json::from_str(&record.entities).map_err(decode_err)?,
            slots: serde_json::from_str(&record.slots).map_err(decode_err)?,
            events: serde_json::from_str(&record.events).map_err(decode_err)?,
            button,
            loop_stack: record.loop_stack as u32,
            response,
        };
        state.validate(domain)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbot_flow::ButtonTrigger;

    fn domain() -> Domain {
        Domain::new(
            vec!["default".into(), "greet".into(), "restart".into()],
            vec!["working_type".into()],
            vec!["working_type".into(), "latest_question".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_fresh_state_defaults() {
        let state = ConversationState::fresh("alice", "Alice", "v0.1");
        assert_eq!(state.intent.name, "default");
        assert_eq!(state.intent.priority, 0);
        assert!(state.entities.is_empty());
        assert!(state.slots.is_empty());
        assert!(state.events.is_empty());
        assert_eq!(state.loop_stack, 0);
        assert!(state.validate(&domain()).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_names() {
        let mut state = ConversationState::fresh("alice", "Alice", "v0.1");
        state.intent = Intent::named("unheard_of");
        assert!(state.validate(&domain()).is_err());

        let mut state = ConversationState::fresh("alice", "Alice", "v0.1");
        state.slots.insert("no_such_slot", Some("x".to_string()));
        assert!(state.validate(&domain()).is_err());
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut state = ConversationState::fresh("alice", "Alice", "v0.1");
        state.intent = Intent::named("greet");
        state.entities = vec![Entity::new("working_type", "shift")];
        state.slots.insert("working_type", Some("shift".to_string()));
        state.slots.insert("latest_question", None);
        state.events = EventOutput {
            set_slot: Some(
                [("latest_question".to_string(), Some("greet".to_string()))]
                    .into_iter()
                    .collect(),
            ),
            ..EventOutput::default()
        };
        state.button = Some(ButtonBindings {
            options: vec![ButtonBinding {
                title: "Greeting".to_string(),
                trigger: ButtonTrigger::for_intent("greet"),
            }],
            synonyms: [("hello".to_string(), "Greeting".to_string())]
                .into_iter()
                .collect(),
        });
        state.response = Some(MessageOutput::text("Hi!"));

        let record = state.export().unwrap();
        let rebuilt = ConversationState::from_record(&record, &domain()).unwrap();
        assert_eq!(rebuilt, state);
    }

    #[test]
    fn test_import_rejects_inconsistent_synonyms() {
        let mut state = ConversationState::fresh("alice", "Alice", "v0.1");
        state.button = Some(ButtonBindings {
            options: vec![ButtonBinding {
                title: "Greeting".to_string(),
                trigger: ButtonTrigger::for_intent("greet"),
            }],
            synonyms: [("hi".to_string(), "Missing".to_string())]
                .into_iter()
                .collect(),
        });

        let record = state.export().unwrap();
        assert!(ConversationState::from_record(&record, &domain()).is_err());
    }
}
