//! Effect accumulator
//!
//! One reduction pass may emit several effects; [`EventOutput`] merges
//! them. Append semantics: scalar effects replace, slot assignments
//! shallow-merge.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use flowbot_core::SlotAssignments;

use crate::event::ButtonTrigger;

/// The merged effects of one reduction pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_slot: Option<SlotAssignments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<ButtonOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl EventOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// An output whose only effect is triggering an intent.
    pub fn trigger(intent: impl Into<String>) -> Self {
        Self {
            trigger_intent: Some(intent.into()),
            ..Self::default()
        }
    }

    /// An output whose only effect is invoking a named action.
    pub fn action(name: impl Into<String>) -> Self {
        Self {
            action: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.set_slot.is_none()
            && self.button.is_none()
            && self.trigger_intent.is_none()
            && self.request_slot.is_none()
            && self.action.is_none()
    }

    /// Merge another output in.
    ///
    /// Scalar effects (text, button, trigger_intent, request_slot,
    /// action) replace the existing value; slot assignments merge.
    pub fn append(&mut self, other: EventOutput) {
        if other.text.is_some() {
            self.text = other.text;
        }
        match (&mut self.set_slot, other.set_slot) {
            (Some(existing), Some(incoming)) => existing.extend(incoming),
            (slot @ None, incoming @ Some(_)) => *slot = incoming,
            _ => {}
        }
        if other.button.is_some() {
            self.button = other.button;
        }
        if other.trigger_intent.is_some() {
            self.trigger_intent = other.trigger_intent;
        }
        if other.request_slot.is_some() {
            self.request_slot = other.request_slot;
        }
        if other.action.is_some() {
            self.action = other.action;
        }
    }
}

/// A button effect ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonOutput {
    /// Prompt text shown above the options
    pub text: String,
    /// Option bindings carried into the next turn
    pub bindings: ButtonBindings,
}

/// One selectable option and the trigger it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub title: String,
    pub trigger: ButtonTrigger,
}

/// The pending button state of a conversation: the option list in
/// display order plus the synonym translation table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ButtonBindings {
    pub options: Vec<ButtonBinding>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub synonyms: HashMap<String, String>,
}

impl ButtonBindings {
    /// Option titles in display order.
    pub fn titles(&self) -> Vec<String> {
        self.options.iter().map(|b| b.title.clone()).collect()
    }

    /// Resolve a user message to an option trigger.
    ///
    /// The message is first translated through the synonym table, then
    /// matched against option titles; both lookups are case-insensitive
    /// exact matches (case folding only, no normalisation).
    pub fn resolve(&self, message: &str) -> Option<&ButtonTrigger> {
        let folded = message.to_lowercase();
        let translated = self
            .synonyms
            .iter()
            .find(|(synonym, _)| synonym.to_lowercase() == folded)
            .map(|(_, title)| title.to_lowercase())
            .unwrap_or(folded);

        self.options
            .iter()
            .find(|binding| binding.title.to_lowercase() == translated)
            .map(|binding| &binding.trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_output(text: &str) -> EventOutput {
        EventOutput {
            text: Some(text.to_string()),
            ..EventOutput::default()
        }
    }

    fn set_slot_output(entries: &[(&str, Option<&str>)]) -> EventOutput {
        let assignments: SlotAssignments = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect();
        EventOutput {
            set_slot: Some(assignments),
            ..EventOutput::default()
        }
    }

    #[test]
    fn test_text_replaces() {
        let mut out = text_output("first");
        out.append(text_output("second"));
        assert_eq!(out.text.as_deref(), Some("second"));
    }

    #[test]
    fn test_set_slot_merges() {
        let mut out = set_slot_output(&[("a", Some("1")), ("b", Some("2"))]);
        out.append(set_slot_output(&[("b", None), ("c", Some("3"))]));

        let merged = out.set_slot.unwrap();
        assert_eq!(merged["a"], Some("1".to_string()));
        assert_eq!(merged["b"], None);
        assert_eq!(merged["c"], Some("3".to_string()));
    }

    #[test]
    fn test_append_is_associative() {
        let a = set_slot_output(&[("x", Some("1"))]);
        let b = text_output("hello");
        let c = set_slot_output(&[("x", Some("2")), ("y", Some("3"))]);

        let mut left = a.clone();
        left.append(b.clone());
        left.append(c.clone());

        let mut inner = b;
        inner.append(c);
        let mut right = a;
        right.append(inner);

        assert_eq!(left, right);
    }

    #[test]
    fn test_empty_append_is_identity() {
        let mut out = text_output("hello");
        out.append(EventOutput::default());
        assert_eq!(out.text.as_deref(), Some("hello"));
        assert!(EventOutput::default().is_empty());
    }

    #[test]
    fn test_bindings_resolve_case_insensitive() {
        let bindings = ButtonBindings {
            options: vec![ButtonBinding {
                title: "Annual leave process".to_string(),
                trigger: ButtonTrigger::default(),
            }],
            synonyms: [(
                "annual leave".to_string(),
                "Annual leave process".to_string(),
            )]
            .into_iter()
            .collect(),
        };

        assert!(bindings.resolve("ANNUAL LEAVE PROCESS").is_some());
        assert!(bindings.resolve("Annual Leave").is_some());
        assert!(bindings.resolve("annual").is_none());
    }
}
