//! The effect vocabulary
//!
//! An event is a pure function from the current `(intent, entities,
//! slots)` to an [`EventOutput`]. Six kinds exist: text, set-slot,
//! request-slot, trigger-intent, button and action.

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use flowbot_core::{Domain, Entity, Intent, SlotAssignments, Slots, DEFAULT_INTENT};

use crate::config::ButtonConfig;
use crate::error::FlowError;
use crate::output::{ButtonBinding, ButtonBindings, ButtonOutput, EventOutput};

/// Delimiter around slot names in text templates (`__slot__`).
pub const SLOT_DELIMITER: &str = "__";

static SLOT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"{SLOT_DELIMITER}([\w][\w ]*?){SLOT_DELIMITER}")).unwrap());

/// One effect of the flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Text(TextEvent),
    SetSlot(SetSlotEvent),
    RequestSlot(RequestSlotEvent),
    TriggerIntent(TriggerIntentEvent),
    Button(ButtonEvent),
    Action(ActionEvent),
}

impl Event {
    /// Check every referenced name against the domain.
    pub fn validate(&self, domain: &Domain, context: &str) -> Result<(), FlowError> {
        match self {
            Event::Text(event) => event.validate(domain, context),
            Event::SetSlot(event) => event.validate(domain, context),
            Event::RequestSlot(event) => event.validate(domain, context),
            Event::TriggerIntent(event) => event.validate(domain, context),
            Event::Button(event) => event.validate(domain, context),
            Event::Action(_) => Ok(()),
        }
    }

    /// Evaluate against the current conversation values.
    pub fn evaluate(&self, intent: &Intent, entities: &[Entity], slots: &Slots) -> EventOutput {
        match self {
            Event::Text(event) => event.evaluate(slots),
            Event::SetSlot(event) => EventOutput {
                set_slot: Some(event.resolve(intent, entities)),
                ..EventOutput::default()
            },
            Event::RequestSlot(event) => EventOutput {
                request_slot: Some(event.slot.clone()),
                ..EventOutput::default()
            },
            Event::TriggerIntent(event) => EventOutput {
                trigger_intent: Some(event.resolve(slots)),
                ..EventOutput::default()
            },
            Event::Button(event) => event.evaluate(),
            Event::Action(event) => EventOutput::action(event.name.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Picks one of its templates uniformly at random and interpolates
/// `__slot__` tokens with the current slot values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextEvent {
    pub templates: Vec<String>,
}

impl TextEvent {
    pub fn new(templates: Vec<String>) -> Self {
        Self { templates }
    }

    fn validate(&self, domain: &Domain, context: &str) -> Result<(), FlowError> {
        if self.templates.is_empty() {
            return Err(FlowError::invalid(context, "text event has no templates"));
        }
        for template in &self.templates {
            for captures in SLOT_PATTERN.captures_iter(template) {
                let slot = &captures[1];
                if !domain.has_slot(slot) {
                    return Err(FlowError::UnknownSlot {
                        name: slot.to_string(),
                        context: context.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, slots: &Slots) -> EventOutput {
        let template = self
            .templates
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default();
        EventOutput {
            text: Some(fill_template(&template, slots)),
            ..EventOutput::default()
        }
    }
}

/// Replace `__slot__` tokens with the slot's value. Tokens naming an
/// unset slot are left literal.
pub(crate) fn fill_template(template: &str, slots: &Slots) -> String {
    SLOT_PATTERN
        .replace_all(template, |captures: &regex::Captures| {
            match slots.get(&captures[1]) {
                Some(value) => value.to_string(),
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Set-slot
// ---------------------------------------------------------------------------

/// How a set-slot entry derives its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotDirective {
    /// Explicit null: clear the slot
    Clear,
    /// Literal value
    Value(String),
    /// Copy from the current intent
    FromIntent { from_intent: FromIntent },
    /// Copy from an extracted entity
    FromEntity {
        from_entity: HashMap<String, EntityValue>,
    },
}

/// The `from_intent` forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FromIntent {
    /// `true`: use the current intent name as the value
    Current(bool),
    /// Per-intent values; applies when the current intent matches a key
    Mapped(HashMap<String, String>),
}

/// The `from_entity` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityValue {
    /// `true`: use the matching entity's text
    Take(bool),
    /// Fixed value whenever the entity is present
    Value(String),
}

/// Assigns one or more slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetSlotEvent {
    pub directives: HashMap<String, SlotDirective>,
}

impl SetSlotEvent {
    pub fn new(directives: HashMap<String, SlotDirective>) -> Self {
        Self { directives }
    }

    /// A set-slot event assigning a single literal value.
    pub fn assign(slot: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            [(slot.into(), SlotDirective::Value(value.into()))]
                .into_iter()
                .collect(),
        )
    }

    fn validate(&self, domain: &Domain, context: &str) -> Result<(), FlowError> {
        for (slot, directive) in &self.directives {
            if !domain.has_slot(slot) {
                return Err(FlowError::UnknownSlot {
                    name: slot.clone(),
                    context: context.to_string(),
                });
            }
            match directive {
                SlotDirective::Clear | SlotDirective::Value(_) => {}
                SlotDirective::FromIntent { from_intent } => match from_intent {
                    FromIntent::Current(true) => {}
                    FromIntent::Current(false) => {
                        return Err(FlowError::invalid(
                            context,
                            format!("`from_intent: false` is not a valid directive for `{slot}`"),
                        ));
                    }
                    FromIntent::Mapped(mapping) => {
                        for intent in mapping.keys() {
                            if !domain.has_intent(intent) {
                                return Err(FlowError::UnknownIntent {
                                    name: intent.clone(),
                                    context: context.to_string(),
                                });
                            }
                        }
                    }
                },
                SlotDirective::FromEntity { from_entity } => {
                    for (entity, value) in from_entity {
                        if !domain.has_entity(entity) {
                            return Err(FlowError::UnknownEntity {
                                name: entity.clone(),
                                context: context.to_string(),
                            });
                        }
                        if matches!(value, EntityValue::Take(false)) {
                            return Err(FlowError::invalid(
                                context,
                                format!("`from_entity` value for `{entity}` must be true or a string"),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve the directives into concrete assignments.
    pub fn resolve(&self, intent: &Intent, entities: &[Entity]) -> SlotAssignments {
        let mut assignments = SlotAssignments::new();
        for (slot, directive) in &self.directives {
            match directive {
                SlotDirective::Clear => {
                    assignments.insert(slot.clone(), None);
                }
                SlotDirective::Value(value) => {
                    assignments.insert(slot.clone(), Some(value.clone()));
                }
                SlotDirective::FromIntent { from_intent } => match from_intent {
                    FromIntent::Current(_) => {
                        assignments.insert(slot.clone(), Some(intent.name.clone()));
                    }
                    FromIntent::Mapped(mapping) => {
                        if let Some(value) = mapping.get(&intent.name) {
                            assignments.insert(slot.clone(), Some(value.clone()));
                        }
                    }
                },
                SlotDirective::FromEntity { from_entity } => {
                    for (entity_name, value) in from_entity {
                        for entity in entities.iter().filter(|e| &e.entity_name == entity_name) {
                            match value {
                                EntityValue::Take(_) => {
                                    assignments.insert(slot.clone(), Some(entity.text.clone()));
                                    break;
                                }
                                EntityValue::Value(fixed) => {
                                    assignments.insert(slot.clone(), Some(fixed.clone()));
                                }
                            }
                        }
                    }
                }
            }
        }
        assignments
    }
}

// ---------------------------------------------------------------------------
// Request-slot and trigger-intent
// ---------------------------------------------------------------------------

/// Hands control to the request map of the named slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestSlotEvent {
    pub slot: String,
}

impl RequestSlotEvent {
    fn validate(&self, domain: &Domain, context: &str) -> Result<(), FlowError> {
        if !domain.has_slot(&self.slot) {
            return Err(FlowError::UnknownSlot {
                name: self.slot.clone(),
                context: context.to_string(),
            });
        }
        Ok(())
    }
}

/// Where a trigger-intent event takes its target from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerIntentTarget {
    /// A fixed intent name
    Intent(String),
    /// Read the intent name from a slot at call time
    FromSlot { from_slot: String },
}

/// Re-enters the flow at another intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerIntentEvent {
    pub target: TriggerIntentTarget,
}

impl TriggerIntentEvent {
    pub fn named(intent: impl Into<String>) -> Self {
        Self {
            target: TriggerIntentTarget::Intent(intent.into()),
        }
    }

    fn validate(&self, domain: &Domain, context: &str) -> Result<(), FlowError> {
        match &self.target {
            TriggerIntentTarget::Intent(name) => {
                if !domain.has_intent(name) {
                    return Err(FlowError::UnknownIntent {
                        name: name.clone(),
                        context: context.to_string(),
                    });
                }
            }
            TriggerIntentTarget::FromSlot { from_slot } => {
                if !domain.has_slot(from_slot) {
                    return Err(FlowError::UnknownSlot {
                        name: from_slot.clone(),
                        context: context.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve the target intent. An unset source slot falls back to the
    /// default intent.
    pub fn resolve(&self, slots: &Slots) -> String {
        match &self.target {
            TriggerIntentTarget::Intent(name) => name.clone(),
            TriggerIntentTarget::FromSlot { from_slot } => slots
                .get(from_slot)
                .map(str::to_string)
                .unwrap_or_else(|| DEFAULT_INTENT.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Button
// ---------------------------------------------------------------------------

/// The guarded event bundle a button option may fire: any combination of
/// text, set-slot and trigger-intent (at least one).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ButtonTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_slot: Option<HashMap<String, SlotDirective>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_intent: Option<TriggerIntentTarget>,
}

impl ButtonTrigger {
    /// A trigger firing a single intent.
    pub fn for_intent(intent: impl Into<String>) -> Self {
        Self {
            trigger_intent: Some(TriggerIntentTarget::Intent(intent.into())),
            ..Self::default()
        }
    }

    pub fn validate(&self, domain: &Domain, context: &str) -> Result<(), FlowError> {
        let mut events = 0;
        if let Some(templates) = &self.text {
            TextEvent::new(templates.clone()).validate(domain, context)?;
            events += 1;
        }
        if let Some(directives) = &self.set_slot {
            SetSlotEvent::new(directives.clone()).validate(domain, context)?;
            events += 1;
        }
        if let Some(target) = &self.trigger_intent {
            TriggerIntentEvent {
                target: target.clone(),
            }
            .validate(domain, context)?;
            events += 1;
        }
        if events == 0 {
            return Err(FlowError::EmptyTrigger {
                context: context.to_string(),
            });
        }
        Ok(())
    }

    /// Evaluate the bundled events in order and merge their outputs.
    pub fn fire(&self, intent: &Intent, entities: &[Entity], slots: &Slots) -> EventOutput {
        let mut output = EventOutput::default();
        if let Some(templates) = &self.text {
            output.append(TextEvent::new(templates.clone()).evaluate(slots));
        }
        if let Some(directives) = &self.set_slot {
            let event = SetSlotEvent::new(directives.clone());
            output.append(EventOutput {
                set_slot: Some(event.resolve(intent, entities)),
                ..EventOutput::default()
            });
        }
        if let Some(target) = &self.trigger_intent {
            let event = TriggerIntentEvent {
                target: target.clone(),
            };
            output.append(EventOutput::trigger(event.resolve(slots)));
        }
        output
    }
}

/// One selectable option of a button event.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonOption {
    pub title: String,
    pub synonyms: Vec<String>,
    pub trigger: ButtonTrigger,
}

/// Shows a prompt with selectable options.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonEvent {
    pub text: String,
    pub options: Vec<ButtonOption>,
}

impl ButtonEvent {
    /// Compile from configuration.
    pub fn compile(config: &ButtonConfig, context: &str) -> Result<Self, FlowError> {
        if config.button.is_empty() {
            return Err(FlowError::invalid(context, "button declares no options"));
        }
        let options = config
            .button
            .iter()
            .map(|option| ButtonOption {
                title: option.title.clone(),
                synonyms: option.synonym.clone(),
                trigger: option.trigger.clone(),
            })
            .collect();
        Ok(Self {
            text: config.text.clone(),
            options,
        })
    }

    fn validate(&self, domain: &Domain, context: &str) -> Result<(), FlowError> {
        for option in &self.options {
            let context = format!("{context}, button `{}`", option.title);
            option.trigger.validate(domain, &context)?;
        }
        Ok(())
    }

    fn evaluate(&self) -> EventOutput {
        let options = self
            .options
            .iter()
            .map(|option| ButtonBinding {
                title: option.title.clone(),
                trigger: option.trigger.clone(),
            })
            .collect();
        let synonyms = self
            .options
            .iter()
            .flat_map(|option| {
                option
                    .synonyms
                    .iter()
                    .map(|synonym| (synonym.clone(), option.title.clone()))
            })
            .collect();

        EventOutput {
            button: Some(ButtonOutput {
                text: self.text.clone(),
                bindings: ButtonBindings { options, synonyms },
            }),
            ..EventOutput::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Defers to a named action from the host's action registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionEvent {
    pub name: String,
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

    #[test]
    fn test_template_interpolation() {
        let mut slots = Slots::new();
        slots.insert("working_type", Some("shift".to_string()));

        assert_eq!(
            fill_template("You work __working_type__ hours", &slots),
            "You work shift hours"
        );
        // unset slots stay literal
        assert_eq!(
            fill_template("Your question: __latest_question__", &slots),
            "Your question: __latest_question__"
        );
        // multiple tokens do not bleed into one another
        slots.insert("latest_question", Some("leave".to_string()));
        assert_eq!(
            fill_template("__working_type__ and __latest_question__", &slots),
            "shift and leave"
        );
    }

    #[test]
    fn test_text_event_validates_placeholders() {
        let domain = domain();
        let known = TextEvent::new(vec!["Hello __working_type__".to_string()]);
        let unknown = TextEvent::new(vec!["Hello __no_such_slot__".to_string()]);

        assert!(known.validate(&domain, "test").is_ok());
        assert!(unknown.validate(&domain, "test").is_err());
    }

    #[test]
    fn test_set_slot_literal_and_clear() {
        let event: SetSlotEvent = serde_yaml::from_str(
            r#"
            working_type: "shift"
            latest_question:
            "#,
        )
        .unwrap();

        let assignments = event.resolve(&Intent::fallback(), &[]);
        assert_eq!(assignments["working_type"], Some("shift".to_string()));
        assert_eq!(assignments["latest_question"], None);
    }

    #[test]
    fn test_set_slot_from_intent() {
        let event: SetSlotEvent = serde_yaml::from_str(
            r#"
            latest_question:
              from_intent: true
            "#,
        )
        .unwrap();

        let intent = Intent::named("greet");
        let assignments = event.resolve(&intent, &[]);
        assert_eq!(assignments["latest_question"], Some("greet".to_string()));
    }

    #[test]
    fn test_set_slot_from_intent_mapping() {
        let event: SetSlotEvent = serde_yaml::from_str(
            r#"
            latest_question:
              from_intent:
                greet: "greeting"
            "#,
        )
        .unwrap();

        let assignments = event.resolve(&Intent::named("greet"), &[]);
        assert_eq!(assignments["latest_question"], Some("greeting".to_string()));

        let assignments = event.resolve(&Intent::named("default"), &[]);
        assert!(assignments.is_empty());
    }

    #[test]
    fn test_set_slot_from_entity() {
        let event: SetSlotEvent = serde_yaml::from_str(
            r#"
            working_type:
              from_entity:
                working_type: true
            "#,
        )
        .unwrap();

        let entities = vec![Entity::new("working_type", "office hours")];
        let assignments = event.resolve(&Intent::fallback(), &entities);
        assert_eq!(assignments["working_type"], Some("office hours".to_string()));

        let assignments = event.resolve(&Intent::fallback(), &[]);
        assert!(assignments.is_empty());
    }

    #[test]
    fn test_trigger_intent_from_slot_falls_back_to_default() {
        let event: TriggerIntentEvent = serde_yaml::from_str("from_slot: latest_question").unwrap();

        let mut slots = Slots::new();
        assert_eq!(event.resolve(&slots), DEFAULT_INTENT);

        slots.insert("latest_question", Some("greet".to_string()));
        assert_eq!(event.resolve(&slots), "greet");
    }

    #[test]
    fn test_button_event_builds_bindings() {
        let config: ButtonConfig = serde_yaml::from_str(
            r#"
            text: "What do you mean?"
            button:
              - title: "Annual leave process"
                synonym: ["annual leave"]
                trigger_intent: AnnualLeaveApplicationProcess
              - title: "Greeting"
                trigger_intent: greet
            "#,
        )
        .unwrap();

        let event = ButtonEvent::compile(&config, "test").unwrap();
        assert!(event.validate(&domain(), "test").is_ok());

        let output = event.evaluate();
        let button = output.button.unwrap();
        assert_eq!(button.text, "What do you mean?");
        assert_eq!(
            button.bindings.titles(),
            vec!["Annual leave process".to_string(), "Greeting".to_string()]
        );
        assert_eq!(
            button.bindings.synonyms.get("annual leave"),
            Some(&"Annual leave process".to_string())
        );
    }

    #[test]
    fn test_button_option_requires_event() {
        let trigger = ButtonTrigger::default();
        assert!(matches!(
            trigger.validate(&domain(), "test"),
            Err(FlowError::EmptyTrigger { .. })
        ));
    }
}
