//! Application state
//!
//! The engine (flow map, controller, conversation cache and store) is
//! immutable once built; [`AppState`] holds it behind an atomically
//! swappable handle so an admin reload replaces the whole snapshot
//! while in-flight turns keep driving the one they started with.

use parking_lot::RwLock;
use std::sync::Arc;

use flowbot_agent::{ActionRegistry, Controller, UserConversations};
use flowbot_config::{load_settings, Settings};
use flowbot_core::{Domain, NluOracle};
use flowbot_flow::{FlowConfig, FlowMap};
use flowbot_persistence::{
    ConversationStore, InMemoryConversationStore, SqliteConversationStore,
};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::nlu::HttpNluOracle;
use crate::ServerError;

/// One immutable snapshot of the running dialogue engine.
pub struct Engine {
    pub flow: Arc<FlowMap>,
    pub controller: Controller,
    pub conversations: UserConversations,
    pub store: Arc<dyn ConversationStore>,
}

impl Engine {
    /// Build an engine from settings and an NLU oracle.
    pub fn build(settings: &Settings, nlu: Arc<dyn NluOracle>) -> Result<Self, ServerError> {
        let domain = Domain::load(&settings.conversation.domain_path)?;
        let config = FlowConfig::load(&settings.conversation.flow_path)?;
        let flow = Arc::new(FlowMap::compile(config, domain)?);

        let store: Arc<dyn ConversationStore> = if settings.persistence.enabled {
            Arc::new(SqliteConversationStore::open(&settings.persistence.db_path)?)
        } else {
            tracing::info!("Persistence disabled, conversations will not survive a restart");
            Arc::new(InMemoryConversationStore::new())
        };

        let controller = Controller::new(nlu, flow.clone(), ActionRegistry::with_defaults());
        let conversations = UserConversations::new(
            store.clone(),
            flow.shared_domain(),
            settings.conversation.user_limit,
            settings.conversation.version.clone(),
        );

        tracing::info!(
            intents = flow.domain().intents().len(),
            entities = flow.domain().entities().len(),
            slots = flow.domain().slots().len(),
            "Engine built"
        );

        Ok(Self {
            flow,
            controller,
            conversations,
            store,
        })
    }
}

/// Shared state across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Settings, replaced on reload
    pub config: Arc<RwLock<Settings>>,
    engine: Arc<RwLock<Arc<Engine>>>,
    /// Prometheus render handle
    pub metrics: Option<PrometheusHandle>,
    /// Instance identifier, for diagnostics
    pub instance_id: String,
    /// Environment name the settings were loaded for
    env: Option<String>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        engine: Engine,
        metrics: Option<PrometheusHandle>,
        env: Option<String>,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(settings)),
            engine: Arc::new(RwLock::new(Arc::new(engine))),
            metrics,
            instance_id: uuid::Uuid::new_v4().to_string(),
            env,
        }
    }

    /// The current engine snapshot.
    pub fn engine(&self) -> Arc<Engine> {
        self.engine.read().clone()
    }

    /// Reload settings and flow configuration, then swap the engine.
    ///
    /// In-flight turns keep the snapshot they grabbed; new requests see
    /// the fresh one.
    pub fn reload(&self) -> Result<(), ServerError> {
        let settings = load_settings(self.env.as_deref())?;
        let nlu: Arc<dyn NluOracle> = Arc::new(HttpNluOracle::new(&settings.nlu)?);
        let engine = Engine::build(&settings, nlu)?;

        *self.config.write() = settings;
        *self.engine.write() = Arc::new(engine);
        tracing::info!("Engine reloaded");
        Ok(())
    }
}
