//! Per-intent and per-slot rule sets

use std::collections::HashMap;

use flowbot_core::{Domain, Entity, Intent, Slots, REQUEST_SLOT};

use crate::condition::{Condition, SlotExpectation};
use crate::config::{ActionMapConfig, RequestMapConfig};
use crate::error::FlowError;
use crate::event::{ButtonEvent, Event, SetSlotEvent, SlotDirective, TextEvent};
use crate::output::EventOutput;
use crate::trigger::Trigger;

/// The rule set executed when an intent is (re)entered.
#[derive(Debug, Clone)]
pub struct ActionMap {
    pub intent: String,
    pub priority: i32,
    slot_to_set: Option<SetSlotEvent>,
    set_slot: Option<SetSlotEvent>,
    triggers: Vec<Trigger>,
}

impl ActionMap {
    /// Compile and validate an action-map config against the domain.
    pub fn compile(config: &ActionMapConfig, domain: &Domain) -> Result<Self, FlowError> {
        let context = format!("action_map `{}`", config.intent);

        if !domain.has_intent(&config.intent) {
            return Err(FlowError::UnknownIntent {
                name: config.intent.clone(),
                context,
            });
        }
        if config.triggers.is_empty() {
            return Err(FlowError::invalid(&context, "triggers must not be empty"));
        }

        let slot_to_set = compile_set_slot(&config.slot_to_set, domain, &context)?;
        let set_slot = compile_set_slot(&config.set_slot, domain, &context)?;
        let triggers = config
            .triggers
            .iter()
            .map(|trigger| Trigger::compile(trigger, domain, &context))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            intent: config.intent.clone(),
            priority: config.priority,
            slot_to_set,
            set_slot,
            triggers,
        })
    }

    /// Run the rule set.
    ///
    /// Sets the intent's priority, applies the pre-step assignments into
    /// the slots in place, then fires the first trigger whose conditions
    /// all hold.
    pub fn evaluate(
        &self,
        intent: &mut Intent,
        entities: &[Entity],
        slots: &mut Slots,
    ) -> EventOutput {
        intent.priority = self.priority;

        let mut output = EventOutput::default();
        for pre_step in [&self.slot_to_set, &self.set_slot].into_iter().flatten() {
            let assignments = pre_step.resolve(intent, entities);
            slots.apply(&assignments);
            output.append(EventOutput {
                set_slot: Some(assignments),
                ..EventOutput::default()
            });
        }

        for trigger in &self.triggers {
            if let Some(fired) = trigger.evaluate(intent, entities, slots) {
                output.append(fired);
                return output;
            }
        }
        output
    }
}

/// The prompt of a request map: exactly one of text or button.
#[derive(Debug, Clone)]
enum RequestPrompt {
    Text(TextEvent),
    Button(ButtonEvent),
}

/// The rule set executed while a slot is being solicited.
#[derive(Debug, Clone)]
pub struct RequestMap {
    pub slot: String,
    set_slot: Option<SetSlotEvent>,
    prompt: RequestPrompt,
    startup_condition: Condition,
    startup_set_slot: SetSlotEvent,
    redirect: Vec<Trigger>,
}

impl RequestMap {
    /// Compile and validate a request-map config against the domain.
    pub fn compile(config: &RequestMapConfig, domain: &Domain) -> Result<Self, FlowError> {
        let context = format!("request_map `{}`", config.slot);

        if !domain.has_slot(&config.slot) {
            return Err(FlowError::UnknownSlot {
                name: config.slot.clone(),
                context,
            });
        }

        let set_slot = compile_set_slot(&config.set_slot, domain, &context)?;

        let prompt = match (&config.text, &config.button) {
            (Some(templates), None) => {
                let event = TextEvent::new(templates.clone());
                Event::Text(event.clone()).validate(domain, &context)?;
                RequestPrompt::Text(event)
            }
            (None, Some(button)) => {
                let event = ButtonEvent::compile(button, &context)?;
                Event::Button(event.clone()).validate(domain, &context)?;
                RequestPrompt::Button(event)
            }
            (None, None) => {
                return Err(FlowError::IncompleteRequest {
                    slot: config.slot.clone(),
                    what: "a text or button prompt",
                })
            }
            (Some(_), Some(_)) => {
                return Err(FlowError::IncompleteRequest {
                    slot: config.slot.clone(),
                    what: "exactly one of text and button, not both",
                })
            }
        };

        if config.redirect.is_empty() {
            return Err(FlowError::IncompleteRequest {
                slot: config.slot.clone(),
                what: "at least one redirect trigger",
            });
        }
        let redirect = config
            .redirect
            .iter()
            .map(|trigger| Trigger::compile(trigger, domain, &context))
            .collect::<Result<Vec<_>, _>>()?;

        let startup_condition = Condition::Slot(
            [
                (config.slot.clone(), SlotExpectation::Set(false)),
                (REQUEST_SLOT.to_string(), SlotExpectation::Set(false)),
            ]
            .into_iter()
            .collect(),
        );
        let startup_set_slot = SetSlotEvent::assign(REQUEST_SLOT, config.slot.clone());

        Ok(Self {
            slot: config.slot.clone(),
            set_slot,
            prompt,
            startup_condition,
            startup_set_slot,
            redirect,
        })
    }

    /// Run the rule set.
    ///
    /// On first entry (slot unset, no slot being requested) this emits
    /// the prompt and marks the slot as requested; on re-entry it runs
    /// the redirect triggers against the user's answer.
    pub fn evaluate(
        &self,
        intent: &mut Intent,
        entities: &[Entity],
        slots: &mut Slots,
    ) -> EventOutput {
        let mut output = EventOutput::default();
        if let Some(set_slot) = &self.set_slot {
            let assignments = set_slot.resolve(intent, entities);
            slots.apply(&assignments);
            output.append(EventOutput {
                set_slot: Some(assignments),
                ..EventOutput::default()
            });
        }

        if self.startup_condition.check(intent, entities, slots) {
            let prompt = match &self.prompt {
                RequestPrompt::Text(event) => {
                    Event::Text(event.clone()).evaluate(intent, entities, slots)
                }
                RequestPrompt::Button(event) => {
                    Event::Button(event.clone()).evaluate(intent, entities, slots)
                }
            };
            output.append(prompt);
            output.append(EventOutput {
                set_slot: Some(self.startup_set_slot.resolve(intent, entities)),
                ..EventOutput::default()
            });
            return output;
        }

        for trigger in &self.redirect {
            if let Some(fired) = trigger.evaluate(intent, entities, slots) {
                output.append(fired);
                return output;
            }
        }
        output
    }
}

fn compile_set_slot(
    directives: &Option<HashMap<String, SlotDirective>>,
    domain: &Domain,
    context: &str,
) -> Result<Option<SetSlotEvent>, FlowError> {
    match directives {
        Some(directives) => {
            let event = SetSlotEvent::new(directives.clone());
            Event::SetSlot(event.clone()).validate(domain, context)?;
            Ok(Some(event))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> Domain {
        Domain::new(
            vec![
                "default".into(),
                "greet".into(),
                "AnnualLeaveApplicationProcess".into(),
            ],
            vec!["working_type".into()],
            vec!["working_type".into(), "latest_question".into()],
        )
        .unwrap()
    }

    fn action_map(yaml: &str) -> ActionMap {
        let config: ActionMapConfig = serde_yaml::from_str(yaml).unwrap();
        ActionMap::compile(&config, &domain()).unwrap()
    }

    fn request_map(yaml: &str) -> RequestMap {
        let config: RequestMapConfig = serde_yaml::from_str(yaml).unwrap();
        RequestMap::compile(&config, &domain()).unwrap()
    }

    #[test]
    fn test_action_map_first_matching_trigger_wins() {
        let map = action_map(
            r#"
            intent: greet
            triggers:
              - slot:
                  working_type: true
                text: ["Welcome back"]
              - text: ["Hi!"]
            "#,
        );

        let mut intent = Intent::named("greet");
        let mut slots = Slots::new();
        let output = map.evaluate(&mut intent, &[], &mut slots);
        assert_eq!(output.text.as_deref(), Some("Hi!"));

        slots.insert("working_type", Some("shift".to_string()));
        let output = map.evaluate(&mut intent, &[], &mut slots);
        assert_eq!(output.text.as_deref(), Some("Welcome back"));
    }

    #[test]
    fn test_action_map_pre_steps_apply_in_place() {
        let map = action_map(
            r#"
            intent: greet
            priority: 2
            set:
              latest_question: greet
            triggers:
              - text: ["Hi!"]
            "#,
        );

        let mut intent = Intent::named("greet");
        intent.priority = 0;
        let mut slots = Slots::new();
        let output = map.evaluate(&mut intent, &[], &mut slots);

        assert_eq!(intent.priority, 2);
        assert_eq!(slots.get("latest_question"), Some("greet"));
        assert_eq!(
            output.set_slot.unwrap()["latest_question"],
            Some("greet".to_string())
        );
    }

    #[test]
    fn test_action_map_requires_triggers() {
        let config: ActionMapConfig = serde_yaml::from_str(
            r#"
            intent: greet
            triggers: []
            "#,
        )
        .unwrap();
        assert!(ActionMap::compile(&config, &domain()).is_err());
    }

    #[test]
    fn test_request_map_prompts_then_marks_requested() {
        let map = request_map(
            r#"
            slot: working_type
            text: ["Are you office hours or shift?"]
            redirect:
              - set_slot:
                  request_slot:
                  working_type:
                    from_entity:
                      working_type: true
                text: ["Noted"]
            "#,
        );

        let mut intent = Intent::named("AnnualLeaveApplicationProcess");
        let mut slots = Slots::new();
        let output = map.evaluate(&mut intent, &[], &mut slots);

        assert_eq!(output.text.as_deref(), Some("Are you office hours or shift?"));
        assert_eq!(
            output.set_slot.unwrap()[REQUEST_SLOT],
            Some("working_type".to_string())
        );
        // the request marker travels through the events, not the slots
        assert!(!slots.is_set(REQUEST_SLOT));
    }

    #[test]
    fn test_request_map_redirect_after_answer() {
        let map = request_map(
            r#"
            slot: working_type
            text: ["Are you office hours or shift?"]
            redirect:
              - set_slot:
                  request_slot:
                  working_type:
                    from_entity:
                      working_type: true
                text: ["Noted"]
            "#,
        );

        let mut intent = Intent::named("AnnualLeaveApplicationProcess");
        let mut slots = Slots::new();
        slots.insert(REQUEST_SLOT, Some("working_type".to_string()));
        let entities = vec![Entity::new("working_type", "office hours")];

        let output = map.evaluate(&mut intent, &entities, &mut slots);
        assert_eq!(output.text.as_deref(), Some("Noted"));
        let assignments = output.set_slot.unwrap();
        assert_eq!(assignments[REQUEST_SLOT], None);
        assert_eq!(assignments["working_type"], Some("office hours".to_string()));
    }

    #[test]
    fn test_request_map_requires_prompt_and_redirect() {
        let missing_prompt: RequestMapConfig = serde_yaml::from_str(
            r#"
            slot: working_type
            redirect:
              - text: ["x"]
            "#,
        )
        .unwrap();
        assert!(matches!(
            RequestMap::compile(&missing_prompt, &domain()),
            Err(FlowError::IncompleteRequest { .. })
        ));

        let missing_redirect: RequestMapConfig = serde_yaml::from_str(
            r#"
            slot: working_type
            text: ["x"]
            "#,
        )
        .unwrap();
        assert!(matches!(
            RequestMap::compile(&missing_redirect, &domain()),
            Err(FlowError::IncompleteRequest { .. })
        ));
    }
}
