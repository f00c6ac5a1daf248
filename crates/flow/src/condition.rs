//! Trigger conditions
//!
//! A condition is a pure predicate over the current `(intent, entities,
//! slots)` of a conversation. Every name a condition references must be
//! declared in the domain; that is checked once when the flow compiles.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use flowbot_core::{Domain, Entity, Intent, Slots};

use crate::error::FlowError;

/// Expectation on a single slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotExpectation {
    /// `true`: the slot must be set; `false`: the slot must be unset
    Set(bool),
    /// The slot must equal this value
    Value(String),
}

/// Expectation on a single entity name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityExpectation {
    /// Only `false` is supported: no entity with this name may be present
    Present(bool),
    /// An entity with this name and this text must be present
    Text(String),
}

/// Constraint on the current intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentConstraint {
    /// The intent name must equal this value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_name: Option<String>,
    /// The intent priority must not exceed this bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// A predicate gating a trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Slot(HashMap<String, SlotExpectation>),
    Entity(HashMap<String, EntityExpectation>),
    Intent(IntentConstraint),
}

impl Condition {
    /// Check every referenced name against the domain.
    pub fn validate(&self, domain: &Domain, context: &str) -> Result<(), FlowError> {
        match self {
            Condition::Slot(expectations) => {
                for name in expectations.keys() {
                    if !domain.has_slot(name) {
                        return Err(FlowError::UnknownSlot {
                            name: name.clone(),
                            context: context.to_string(),
                        });
                    }
                }
            }
            Condition::Entity(expectations) => {
                for (name, expectation) in expectations {
                    if !domain.has_entity(name) {
                        return Err(FlowError::UnknownEntity {
                            name: name.clone(),
                            context: context.to_string(),
                        });
                    }
                    if matches!(expectation, EntityExpectation::Present(true)) {
                        return Err(FlowError::invalid(
                            context,
                            format!("entity condition `{name}` does not support `true`"),
                        ));
                    }
                }
            }
            Condition::Intent(constraint) => {
                if let Some(name) = &constraint.intent_name {
                    if !domain.has_intent(name) {
                        return Err(FlowError::UnknownIntent {
                            name: name.clone(),
                            context: context.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Evaluate against the current conversation values.
    pub fn check(&self, intent: &Intent, entities: &[Entity], slots: &Slots) -> bool {
        match self {
            Condition::Slot(expectations) => {
                expectations.iter().all(|(name, expectation)| match expectation {
                    SlotExpectation::Set(true) => slots.is_set(name),
                    SlotExpectation::Set(false) => !slots.is_set(name),
                    SlotExpectation::Value(value) => slots.get(name) == Some(value.as_str()),
                })
            }
            Condition::Entity(expectations) => {
                expectations.iter().all(|(name, expectation)| {
                    let named = entities.iter().filter(|e| &e.entity_name == name);
                    match expectation {
                        EntityExpectation::Present(present) => {
                            (named.count() > 0) == *present
                        }
                        EntityExpectation::Text(text) => {
                            named.into_iter().any(|e| &e.text == text)
                        }
                    }
                })
            }
            Condition::Intent(constraint) => {
                let name_ok = constraint
                    .intent_name
                    .as_ref()
                    .map_or(true, |name| &intent.name == name);
                let priority_ok = constraint
                    .priority
                    .map_or(true, |bound| intent.priority <= bound);
                name_ok && priority_ok
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> Domain {
        Domain::new(
            vec!["default".into(), "greet".into()],
            vec!["working_type".into()],
            vec!["working_type".into(), "latest_question".into()],
        )
        .unwrap()
    }

    fn slot_condition(entries: &[(&str, SlotExpectation)]) -> Condition {
        Condition::Slot(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_slot_condition() {
        let mut slots = Slots::new();
        slots.insert("working_type", Some("shift".to_string()));

        let intent = Intent::fallback();
        let set = slot_condition(&[("working_type", SlotExpectation::Set(true))]);
        let unset = slot_condition(&[("latest_question", SlotExpectation::Set(false))]);
        let equals = slot_condition(&[(
            "working_type",
            SlotExpectation::Value("shift".to_string()),
        )]);
        let differs = slot_condition(&[(
            "working_type",
            SlotExpectation::Value("office hours".to_string()),
        )]);

        assert!(set.check(&intent, &[], &slots));
        assert!(unset.check(&intent, &[], &slots));
        assert!(equals.check(&intent, &[], &slots));
        assert!(!differs.check(&intent, &[], &slots));
    }

    #[test]
    fn test_entity_condition() {
        let intent = Intent::fallback();
        let entities = vec![Entity::new("working_type", "office hours")];

        let absent = Condition::Entity(
            [("working_type".to_string(), EntityExpectation::Present(false))]
                .into_iter()
                .collect(),
        );
        let text = Condition::Entity(
            [(
                "working_type".to_string(),
                EntityExpectation::Text("office hours".to_string()),
            )]
            .into_iter()
            .collect(),
        );

        assert!(!absent.check(&intent, &entities, &Slots::new()));
        assert!(absent.check(&intent, &[], &Slots::new()));
        assert!(text.check(&intent, &entities, &Slots::new()));
        assert!(!text.check(&intent, &[], &Slots::new()));
    }

    #[test]
    fn test_intent_condition() {
        let mut intent = Intent::named("greet");
        intent.priority = 1;

        let named = Condition::Intent(IntentConstraint {
            intent_name: Some("greet".to_string()),
            priority: None,
        });
        let bounded = Condition::Intent(IntentConstraint {
            intent_name: None,
            priority: Some(0),
        });

        assert!(named.check(&intent, &[], &Slots::new()));
        assert!(!bounded.check(&intent, &[], &Slots::new()));

        intent.priority = 0;
        assert!(bounded.check(&intent, &[], &Slots::new()));
    }

    #[test]
    fn test_validation_rejects_unknown_names() {
        let domain = domain();
        let unknown = slot_condition(&[("no_such_slot", SlotExpectation::Set(true))]);
        assert!(unknown.validate(&domain, "test").is_err());

        let entity_true = Condition::Entity(
            [("working_type".to_string(), EntityExpectation::Present(true))]
                .into_iter()
                .collect(),
        );
        assert!(entity_true.validate(&domain, "test").is_err());
    }
}
