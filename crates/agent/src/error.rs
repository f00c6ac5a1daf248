//! Agent errors

use thiserror::Error;

use flowbot_persistence::PersistenceError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Conversation state for `{user_id}` is invalid: {message}")]
    InvalidState { user_id: String, message: String },

    #[error("Cannot decode stored conversation: {0}")]
    Decode(String),

    #[error("Cannot encode conversation for storage: {0}")]
    Encode(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
