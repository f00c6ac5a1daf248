//! Domain registry
//!
//! The domain is the closed vocabulary of a deployment: the intent,
//! entity and slot names every other component validates against. It is
//! loaded once at startup and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{DEFAULT_INTENT, REQUEST_SLOT};

/// The recognised intent, entity and slot names of a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DomainFile", into = "DomainFile")]
pub struct Domain {
    intents: Vec<String>,
    entities: Vec<String>,
    slots: Vec<String>,
    intent_set: HashSet<String>,
    entity_set: HashSet<String>,
    slot_set: HashSet<String>,
}

/// On-disk form of the domain (three string lists).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DomainFile {
    intents: Vec<String>,
    entities: Vec<String>,
    slots: Vec<String>,
}

impl TryFrom<DomainFile> for Domain {
    type Error = Error;

    fn try_from(file: DomainFile) -> Result<Self> {
        Domain::new(file.intents, file.entities, file.slots)
    }
}

impl From<Domain> for DomainFile {
    fn from(domain: Domain) -> Self {
        Self {
            intents: domain.intents,
            entities: domain.entities,
            slots: domain.slots,
        }
    }
}

impl Domain {
    /// Build a domain from the three name lists.
    ///
    /// The `default` intent must be declared; the reserved `request_slot`
    /// slot is appended when missing. Duplicates are rejected.
    pub fn new(
        intents: Vec<String>,
        entities: Vec<String>,
        mut slots: Vec<String>,
    ) -> Result<Self> {
        if !intents.iter().any(|i| i == DEFAULT_INTENT) {
            return Err(Error::InvalidDomain(format!(
                "intent `{DEFAULT_INTENT}` must be declared"
            )));
        }

        if !slots.iter().any(|s| s == REQUEST_SLOT) {
            slots.push(REQUEST_SLOT.to_string());
        }

        let intent_set = unique_set("intent", &intents)?;
        let entity_set = unique_set("entity", &entities)?;
        let slot_set = unique_set("slot", &slots)?;

        Ok(Self {
            intents,
            entities,
            slots,
            intent_set,
            entity_set,
            slot_set,
        })
    }

    /// Load a domain from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::DomainFile {
            path: path.as_ref().display().to_string(),
            message: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| Error::DomainParse(e.to_string()))
    }

    pub fn has_intent(&self, name: &str) -> bool {
        self.intent_set.contains(name)
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entity_set.contains(name)
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.slot_set.contains(name)
    }

    pub fn intents(&self) -> &[String] {
        &self.intents
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }
}

fn unique_set(kind: &str, names: &[String]) -> Result<HashSet<String>> {
    let mut set = HashSet::with_capacity(names.len());
    for name in names {
        if name.is_empty() {
            return Err(Error::InvalidDomain(format!("empty {kind} name")));
        }
        if !set.insert(name.clone()) {
            return Err(Error::InvalidDomain(format!(
                "duplicate {kind} `{name}`"
            )));
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Domain {
        Domain::new(
            vec!["greet".to_string(), "default".to_string()],
            vec!["working_type".to_string()],
            vec!["latest_question".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_request_slot_is_implicit() {
        let domain = sample();
        assert!(domain.has_slot(REQUEST_SLOT));
        assert!(domain.has_slot("latest_question"));
    }

    #[test]
    fn test_default_intent_required() {
        let result = Domain::new(
            vec!["greet".to_string()],
            Vec::new(),
            Vec::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicates_rejected() {
        let result = Domain::new(
            vec!["default".to_string(), "default".to_string()],
            Vec::new(),
            Vec::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let domain = sample();
        let yaml = serde_yaml::to_string(&domain).unwrap();
        let parsed: Domain = serde_yaml::from_str(&yaml).unwrap();
        assert!(parsed.has_intent("greet"));
        assert!(parsed.has_entity("working_type"));
        assert!(parsed.has_slot(REQUEST_SLOT));
    }
}
