//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversation engine configuration
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Conversation log configuration
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// NLU oracle endpoint configuration
    #[serde(default)]
    pub nlu: NluConfig,
}

impl Settings {
    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }
        if self.conversation.user_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "conversation.user_limit".to_string(),
                message: "at least one conversation must fit in memory".to_string(),
            });
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Conversation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Version tag written into every exported snapshot
    #[serde(default = "default_version")]
    pub version: String,
    /// Maximum number of conversations held in memory
    #[serde(default = "default_user_limit")]
    pub user_limit: usize,
    /// Path to the domain file
    #[serde(default = "default_domain_path")]
    pub domain_path: String,
    /// Path to the flow configuration
    #[serde(default = "default_flow_path")]
    pub flow_path: String,
}

fn default_version() -> String {
    "v0.1".to_string()
}

fn default_user_limit() -> usize {
    100
}

fn default_domain_path() -> String {
    "config/domain.yaml".to_string()
}

fn default_flow_path() -> String {
    "config/flow.yaml".to_string()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            user_limit: default_user_limit(),
            domain_path: default_domain_path(),
            flow_path: default_flow_path(),
        }
    }
}

/// Conversation log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Disabled means conversations do not survive a restart
    #[serde(default = "default_persistence_enabled")]
    pub enabled: bool,
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_persistence_enabled() -> bool {
    true
}

fn default_db_path() -> String {
    "data/chat_state.db".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_persistence_enabled(),
            db_path: default_db_path(),
        }
    }
}

/// NLU oracle endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NluConfig {
    /// Classification endpoint (POST, JSON body `{"text": ...}`)
    #[serde(default = "default_nlu_endpoint")]
    pub endpoint: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_nlu_timeout")]
    pub timeout_secs: u64,
}

fn default_nlu_endpoint() -> String {
    "http://127.0.0.1:5005/model/parse".to_string()
}

fn default_nlu_timeout() -> u64 {
    10
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            endpoint: default_nlu_endpoint(),
            timeout_secs: default_nlu_timeout(),
        }
    }
}

/// Load settings with layered precedence:
/// env vars > `config/{env}.yaml` > `config/default.yaml` > defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("FLOWBOT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.conversation.user_limit, 100);
        assert!(settings.persistence.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_user_limit() {
        let mut settings = Settings::default();
        settings.conversation.user_limit = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let settings: Settings = serde_yaml::from_str(
            r#"
            server:
              port: 9000
            persistence:
              enabled: false
            "#,
        )
        .unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert!(!settings.persistence.enabled);
        assert_eq!(settings.conversation.flow_path, "config/flow.yaml");
    }
}
