//! Named actions
//!
//! Actions are the escape hatch of the flow: callable units referenced
//! by name from `action` events. They are registered explicitly at
//! startup; two built-ins are always available, `default` (the fallback
//! prompt with ranked suggestions) and `restart` (wipe the slots).

use std::collections::HashMap;
use std::sync::Arc;

use flowbot_core::{Entity, Intent, SlotAssignments, Slots};
use flowbot_flow::{ButtonBinding, ButtonBindings, ButtonOutput, ButtonTrigger, EventOutput};

/// Prompt text of the built-in `default` action.
pub const FALLBACK_PROMPT: &str = "Sorry, I don't understand, what do you mean?";

/// Text of the built-in `restart` action.
const RESTART_TEXT: &str = "Conversation has been restarted";

/// Number of ranked intents the fallback prompt suggests.
const SUGGESTION_LIMIT: usize = 5;

/// A named callable effect.
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    /// Produce the action's effects for the current conversation values.
    fn call(&self, intent: &Intent, entities: &[Entity], slots: &Slots) -> EventOutput;
}

/// Registry of actions, keyed by name.
///
/// Actions are registered explicitly at startup and the registry is
/// immutable afterwards.
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// A registry with the two required built-ins.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DefaultAction::new());
        registry.register(RestartAction);
        registry
    }

    pub fn register<A: Action + 'static>(&mut self, action: A) {
        self.actions
            .insert(action.name().to_string(), Arc::new(action));
    }

    pub fn register_arc(&mut self, action: Arc<dyn Action>) {
        self.actions.insert(action.name().to_string(), action);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Action>> {
        self.actions.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// The fallback action: a button prompt suggesting the top ranked
/// intents, restricted to a curated intent → friendly-title map, with a
/// trailing `Restart` option.
pub struct DefaultAction {
    titles: HashMap<String, String>,
}

impl DefaultAction {
    /// Use the built-in title map.
    pub fn new() -> Self {
        Self {
            titles: builtin_titles(),
        }
    }

    /// Use a custom intent → friendly-title map.
    pub fn with_titles(titles: HashMap<String, String>) -> Self {
        Self { titles }
    }
}

impl Default for DefaultAction {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for DefaultAction {
    fn name(&self) -> &str {
        "default"
    }

    fn call(&self, intent: &Intent, _entities: &[Entity], _slots: &Slots) -> EventOutput {
        let mut options: Vec<ButtonBinding> = intent
            .ranked()
            .into_iter()
            .filter_map(|(name, _score)| {
                self.titles.get(name).map(|title| ButtonBinding {
                    title: title.clone(),
                    trigger: ButtonTrigger::for_intent(name),
                })
            })
            .take(SUGGESTION_LIMIT)
            .collect();
        options.push(ButtonBinding {
            title: "Restart".to_string(),
            trigger: ButtonTrigger::for_intent("restart"),
        });

        EventOutput {
            button: Some(ButtonOutput {
                text: FALLBACK_PROMPT.to_string(),
                bindings: ButtonBindings {
                    options,
                    synonyms: HashMap::new(),
                },
            }),
            ..EventOutput::default()
        }
    }
}

/// The restart action: clear every currently set slot and confirm.
pub struct RestartAction;

impl Action for RestartAction {
    fn name(&self) -> &str {
        "restart"
    }

    fn call(&self, _intent: &Intent, _entities: &[Entity], slots: &Slots) -> EventOutput {
        let cleared: SlotAssignments = slots
            .set_names()
            .into_iter()
            .map(|name| (name.to_string(), None))
            .collect();

        EventOutput {
            set_slot: Some(cleared),
            text: Some(RESTART_TEXT.to_string()),
            ..EventOutput::default()
        }
    }
}

/// The curated intent → friendly-title map the fallback prompt draws
/// its suggestions from.
fn builtin_titles() -> HashMap<String, String> {
    [
        ("WorkTimesBreaches", "Work time breaches"),
        ("WorkingTimeBreachDiscipline", "Work time discipline"),
        ("HolidaysOff", "Holidays"),
        ("AnnualLeaveApplicationProcess", "Annual leave process"),
        ("WorkingHours", "Working time"),
        ("WorkingDay", "Working day"),
        ("BreakTime", "Break time"),
        ("Pregnant", "Pregnant policies"),
        ("AttendanceRecord", "Attendance checking"),
        ("LaborContract", "Labor contract"),
        ("Recruitment", "Recruitment"),
        ("SickLeave", "Sick leave"),
        ("UnpaidLeave", "Unpaid leave"),
        ("PaidLeaveForFamilyEvent", "Family events"),
        ("UnusedAnnualLeave", "Unused annual leave"),
        ("RegulatedAnnualLeave", "Regulated Annual Leave"),
    ]
    .into_iter()
    .map(|(intent, title)| (intent.to_string(), title.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_builtins() {
        let registry = ActionRegistry::with_defaults();
        assert!(registry.has("default"));
        assert!(registry.has("restart"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_default_action_suggests_ranked_intents() {
        let mut intent = Intent::fallback();
        intent
            .intent_ranking
            .insert("AnnualLeaveApplicationProcess".to_string(), 0.6);
        intent.intent_ranking.insert("WorkingHours".to_string(), 0.3);
        // intents outside the curated map are skipped
        intent.intent_ranking.insert("greet".to_string(), 0.9);

        let output = DefaultAction::new().call(&intent, &[], &Slots::new());
        let button = output.button.unwrap();
        assert_eq!(button.text, FALLBACK_PROMPT);
        assert_eq!(
            button.bindings.titles(),
            vec![
                "Annual leave process".to_string(),
                "Working time".to_string(),
                "Restart".to_string(),
            ]
        );
    }

    #[test]
    fn test_default_action_caps_suggestions() {
        let mut intent = Intent::fallback();
        for (i, name) in [
            "WorkTimesBreaches",
            "HolidaysOff",
            "WorkingDay",
            "BreakTime",
            "SickLeave",
            "UnpaidLeave",
            "Recruitment",
        ]
        .iter()
        .enumerate()
        {
            intent
                .intent_ranking
                .insert(name.to_string(), 0.9 - i as f32 * 0.1);
        }

        let output = DefaultAction::new().call(&intent, &[], &Slots::new());
        let titles = output.button.unwrap().bindings.titles();
        // five suggestions plus Restart
        assert_eq!(titles.len(), 6);
        assert_eq!(titles.last().unwrap(), "Restart");
    }

    #[test]
    fn test_restart_action_clears_set_slots() {
        let mut slots = Slots::new();
        slots.insert("working_type", Some("shift".to_string()));
        slots.insert("latest_question", None);

        let output = RestartAction.call(&Intent::fallback(), &[], &slots);
        assert_eq!(output.text.as_deref(), Some(RESTART_TEXT));

        let cleared = output.set_slot.unwrap();
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared["working_type"], None);
    }
}
