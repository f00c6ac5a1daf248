//! Flowbot server
//!
//! The REST surface over the dialogue core: one chat endpoint, the
//! conversation-log queries, health/metrics, and an admin reload that
//! atomically swaps the engine snapshot.

pub mod channel;
pub mod http;
pub mod metrics;
pub mod nlu;
pub mod state;

pub use channel::ConsoleChannel;
pub use http::create_router;
pub use metrics::init_metrics;
pub use nlu::HttpNluOracle;
pub use state::{AppState, Engine};

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Flow error: {0}")]
    Flow(#[from] flowbot_flow::FlowError),

    #[error("Domain error: {0}")]
    Core(#[from] flowbot_core::Error),

    #[error("Config error: {0}")]
    Config(#[from] flowbot_config::ConfigError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] flowbot_persistence::PersistenceError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
