//! Flow configuration
//!
//! The on-disk form of a flow: an ordered list of action-map entries
//! and request-map entries. Parsing is strict (unknown keys are
//! rejected);
//! name resolution against the domain happens when the [`FlowMap`]
//! compiles.
//!
//! [`FlowMap`]: crate::flow_map::FlowMap

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::condition::{EntityExpectation, IntentConstraint, SlotExpectation};
use crate::error::FlowError;
use crate::event::{ButtonTrigger, SlotDirective, TriggerIntentTarget};

/// The root flow configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default)]
    pub actions_map: Vec<ActionMapConfig>,
    #[serde(default)]
    pub requests_map: Vec<RequestMapConfig>,
}

impl FlowConfig {
    /// Load a flow configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FlowError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| FlowError::FileNotFound {
                path: path.as_ref().display().to_string(),
                message: e.to_string(),
            })?;
        serde_yaml::from_str(&content).map_err(|e| FlowError::Parse(e.to_string()))
    }
}

/// Rule set for one intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionMapConfig {
    pub intent: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Pre-step applied before `set_slot`
    #[serde(
        rename = "set",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub slot_to_set: Option<HashMap<String, SlotDirective>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_slot: Option<HashMap<String, SlotDirective>>,
    pub triggers: Vec<TriggerConfig>,
}

fn default_priority() -> i32 {
    1
}

/// Rule set for one solicited slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestMapConfig {
    pub slot: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_slot: Option<HashMap<String, SlotDirective>>,
    /// Prompt as text templates (exactly one of `text`/`button`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    /// Prompt as a button (exactly one of `text`/`button`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<ButtonConfig>,
    /// Triggers evaluated once the user has answered
    #[serde(default)]
    pub redirect: Vec<TriggerConfig>,
}

/// One guarded bundle of conditions and events.
///
/// Keys outside the defined condition/event vocabulary are rejected at
/// parse time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerConfig {
    // conditions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<HashMap<String, SlotExpectation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<HashMap<String, EntityExpectation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentConstraint>,
    // events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_slot: Option<HashMap<String, SlotDirective>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_intent: Option<TriggerIntentTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<ButtonConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Button prompt configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ButtonConfig {
    pub text: String,
    pub button: Vec<ButtonOptionConfig>,
}

/// One option of a button prompt: a title, optional accepted synonyms,
/// and the events to fire when chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonOptionConfig {
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonym: Vec<String>,
    #[serde(flatten)]
    pub trigger: ButtonTrigger,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action_map_config() {
        let config: FlowConfig = serde_yaml::from_str(
            r#"
            actions_map:
              - intent: greet
                set:
                  latest_question: greet
                triggers:
                  - text: ["Hi!"]
            requests_map: []
            "#,
        )
        .unwrap();

        assert_eq!(config.actions_map.len(), 1);
        let action = &config.actions_map[0];
        assert_eq!(action.intent, "greet");
        assert_eq!(action.priority, 1);
        assert!(action.slot_to_set.is_some());
        assert_eq!(action.triggers.len(), 1);
    }

    #[test]
    fn test_unknown_trigger_key_rejected() {
        let result: Result<TriggerConfig, _> =
            serde_yaml::from_str("no_such_effect: [\"x\"]");
        assert!(result.is_err());
    }

    #[test]
    fn test_round_trip() {
        let yaml = r#"
            actions_map:
              - intent: restart
                triggers:
                  - action: restart
            requests_map:
              - slot: working_type
                text: ["Are you office hours or shift?"]
                redirect:
                  - slot:
                      working_type: "office hours"
                    set_slot:
                      request_slot:
                    text: ["Office it is"]
            "#;
        let config: FlowConfig = serde_yaml::from_str(yaml).unwrap();
        let dumped = serde_yaml::to_string(&config).unwrap();
        let reparsed: FlowConfig = serde_yaml::from_str(&dumped).unwrap();
        assert_eq!(config, reparsed);
    }
}
