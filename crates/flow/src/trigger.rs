//! Compiled triggers

use flowbot_core::{Domain, Entity, Intent, Slots};

use crate::condition::Condition;
use crate::config::TriggerConfig;
use crate::error::FlowError;
use crate::event::{
    ActionEvent, ButtonEvent, Event, RequestSlotEvent, SetSlotEvent, TextEvent,
    TriggerIntentEvent,
};
use crate::output::EventOutput;

/// A guarded bundle of events: fires iff every condition holds.
#[derive(Debug, Clone)]
pub struct Trigger {
    conditions: Vec<Condition>,
    events: Vec<Event>,
}

impl Trigger {
    /// Compile and validate a trigger config against the domain.
    ///
    /// A trigger may have zero conditions but must declare at least one
    /// event.
    pub fn compile(
        config: &TriggerConfig,
        domain: &Domain,
        context: &str,
    ) -> Result<Self, FlowError> {
        let mut conditions = Vec::new();
        if let Some(slot) = &config.slot {
            conditions.push(Condition::Slot(slot.clone()));
        }
        if let Some(entity) = &config.entity {
            conditions.push(Condition::Entity(entity.clone()));
        }
        if let Some(intent) = &config.intent {
            conditions.push(Condition::Intent(intent.clone()));
        }

        let mut events = Vec::new();
        if let Some(templates) = &config.text {
            events.push(Event::Text(TextEvent::new(templates.clone())));
        }
        if let Some(directives) = &config.set_slot {
            events.push(Event::SetSlot(SetSlotEvent::new(directives.clone())));
        }
        if let Some(slot) = &config.request_slot {
            events.push(Event::RequestSlot(RequestSlotEvent { slot: slot.clone() }));
        }
        if let Some(target) = &config.trigger_intent {
            events.push(Event::TriggerIntent(TriggerIntentEvent {
                target: target.clone(),
            }));
        }
        if let Some(button) = &config.button {
            events.push(Event::Button(ButtonEvent::compile(button, context)?));
        }
        if let Some(name) = &config.action {
            events.push(Event::Action(ActionEvent { name: name.clone() }));
        }

        if events.is_empty() {
            return Err(FlowError::EmptyTrigger {
                context: context.to_string(),
            });
        }

        let trigger = Self { conditions, events };
        trigger.validate(domain, context)?;
        Ok(trigger)
    }

    fn validate(&self, domain: &Domain, context: &str) -> Result<(), FlowError> {
        for condition in &self.conditions {
            condition.validate(domain, context)?;
        }
        for event in &self.events {
            event.validate(domain, context)?;
        }
        Ok(())
    }

    /// Evaluate the trigger.
    ///
    /// Returns `None` when a condition fails (distinguishable from a
    /// fired trigger with an empty merge).
    pub fn evaluate(
        &self,
        intent: &Intent,
        entities: &[Entity],
        slots: &Slots,
    ) -> Option<EventOutput> {
        if !self
            .conditions
            .iter()
            .all(|condition| condition.check(intent, entities, slots))
        {
            return None;
        }

        let mut output = EventOutput::default();
        for event in &self.events {
            output.append(event.evaluate(intent, entities, slots));
        }
        Some(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> Domain {
        Domain::new(
            vec!["default".into(), "greet".into()],
            vec!["working_type".into()],
            vec!["working_type".into()],
        )
        .unwrap()
    }

    fn compile(yaml: &str) -> Result<Trigger, FlowError> {
        let config: TriggerConfig = serde_yaml::from_str(yaml).unwrap();
        Trigger::compile(&config, &domain(), "test")
    }

    #[test]
    fn test_fires_iff_all_conditions_hold() {
        let trigger = compile(
            r#"
            slot:
              working_type: "shift"
            text: ["Shift worker"]
            "#,
        )
        .unwrap();

        let intent = Intent::fallback();
        let mut slots = Slots::new();
        assert!(trigger.evaluate(&intent, &[], &slots).is_none());

        slots.insert("working_type", Some("shift".to_string()));
        let output = trigger.evaluate(&intent, &[], &slots).unwrap();
        assert_eq!(output.text.as_deref(), Some("Shift worker"));
    }

    #[test]
    fn test_unconditional_trigger_always_fires() {
        let trigger = compile(r#"text: ["Hi!"]"#).unwrap();
        let output = trigger.evaluate(&Intent::fallback(), &[], &Slots::new());
        assert!(output.is_some());
    }

    #[test]
    fn test_events_merge_in_order() {
        let trigger = compile(
            r#"
            set_slot:
              working_type: "shift"
            text: ["Done"]
            "#,
        )
        .unwrap();

        let output = trigger
            .evaluate(&Intent::fallback(), &[], &Slots::new())
            .unwrap();
        assert_eq!(output.text.as_deref(), Some("Done"));
        assert_eq!(
            output.set_slot.unwrap()["working_type"],
            Some("shift".to_string())
        );
    }

    #[test]
    fn test_zero_events_rejected() {
        let result = compile(
            r#"
            slot:
              working_type: true
            "#,
        );
        assert!(matches!(result, Err(FlowError::EmptyTrigger { .. })));
    }
}
