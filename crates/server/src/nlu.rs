//! HTTP client for the external NLU classifier
//!
//! The classifier is a collaborator, not part of the core: one POST per
//! utterance, JSON in (`{"text": ...}`), classification out. Any
//! transport or decoding failure surfaces as an NLU error, which the
//! driver turns into a default response.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use flowbot_config::NluConfig;
use flowbot_core::{Error, NluOracle, NluResult, Result};

/// NLU oracle backed by an HTTP endpoint.
pub struct HttpNluOracle {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNluOracle {
    pub fn new(config: &NluConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Nlu(format!("cannot build NLU client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl NluOracle for HttpNluOracle {
    async fn classify(&self, utterance: &str) -> Result<NluResult> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "text": utterance }))
            .send()
            .await
            .map_err(|e| Error::Nlu(format!("request to {} failed: {e}", self.endpoint)))?
            .error_for_status()
            .map_err(|e| Error::Nlu(format!("NLU endpoint returned an error: {e}")))?;

        response
            .json::<NluResult>()
            .await
            .map_err(|e| Error::Nlu(format!("malformed NLU response: {e}")))
    }
}
