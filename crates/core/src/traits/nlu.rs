//! NLU oracle interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::types::Entity;

/// Classification result for one utterance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NluResult {
    /// Best intent name as reported by the classifier
    pub intent: String,
    /// Confidence per candidate intent
    #[serde(default)]
    pub intent_ranking: HashMap<String, f32>,
    /// Entities extracted from the utterance
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// The NLU classifier, treated as an oracle by the dialogue core.
///
/// Intent names outside the flow configuration are remapped to the
/// fallback intent by the driver, not by implementations.
#[async_trait]
pub trait NluOracle: Send + Sync {
    /// Classify one utterance into an intent ranking and entities.
    async fn classify(&self, utterance: &str) -> Result<NluResult>;
}
