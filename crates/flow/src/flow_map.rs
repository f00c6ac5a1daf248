//! The root flow registry

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use flowbot_core::{Domain, DEFAULT_INTENT};

use crate::config::FlowConfig;
use crate::error::FlowError;
use crate::mapping::{ActionMap, RequestMap};

/// The compiled flow of a deployment: intent → [`ActionMap`] and
/// slot → [`RequestMap`] registries, plus the domain they were
/// validated against. Immutable after construction and shared across
/// all conversations.
#[derive(Debug, Clone)]
pub struct FlowMap {
    domain: Arc<Domain>,
    config: FlowConfig,
    actions: HashMap<String, ActionMap>,
    requests: HashMap<String, RequestMap>,
}

impl FlowMap {
    /// Compile a flow configuration against a domain.
    ///
    /// Every referenced intent/entity/slot name must be declared, and
    /// the `default` intent must have an action map so fallback dispatch
    /// always resolves.
    pub fn compile(config: FlowConfig, domain: Domain) -> Result<Self, FlowError> {
        let domain = Arc::new(domain);

        let mut actions = HashMap::new();
        for action_config in &config.actions_map {
            let action = ActionMap::compile(action_config, &domain)?;
            actions.insert(action.intent.clone(), action);
        }

        let mut requests = HashMap::new();
        for request_config in &config.requests_map {
            let request = RequestMap::compile(request_config, &domain)?;
            requests.insert(request.slot.clone(), request);
        }

        if !actions.contains_key(DEFAULT_INTENT) {
            return Err(FlowError::invalid(
                "flow config",
                format!("an action_map for `{DEFAULT_INTENT}` must be declared"),
            ));
        }

        Ok(Self {
            domain,
            config,
            actions,
            requests,
        })
    }

    /// Load and compile from YAML files.
    pub fn load<P: AsRef<Path>>(flow_path: P, domain_path: P) -> Result<Self, FlowError> {
        let domain = Domain::load(domain_path)
            .map_err(|e| FlowError::Parse(e.to_string()))?;
        let config = FlowConfig::load(flow_path)?;
        Self::compile(config, domain)
    }

    pub fn action(&self, intent: &str) -> Option<&ActionMap> {
        self.actions.get(intent)
    }

    pub fn request(&self, slot: &str) -> Option<&RequestMap> {
        self.requests.get(slot)
    }

    /// The priority an intent resolves to, when it has an action map.
    pub fn priority_of(&self, intent: &str) -> Option<i32> {
        self.actions.get(intent).map(|action| action.priority)
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn shared_domain(&self) -> Arc<Domain> {
        self.domain.clone()
    }

    /// The configuration this flow was compiled from.
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }
}
