//! Flow configuration errors
//!
//! All of these are fatal at startup: a flow that references unknown
//! names or declares incomplete rules must not come up.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Flow config file not found: {path}: {message}")]
    FileNotFound { path: String, message: String },

    #[error("Failed to parse flow config: {0}")]
    Parse(String),

    #[error("Intent `{name}` is not an available intent (in {context})")]
    UnknownIntent { name: String, context: String },

    #[error("Entity `{name}` is not an available entity (in {context})")]
    UnknownEntity { name: String, context: String },

    #[error("Slot `{name}` is not an available slot (in {context})")]
    UnknownSlot { name: String, context: String },

    #[error("At least one event must be specified (in {context})")]
    EmptyTrigger { context: String },

    #[error("Request map for `{slot}` must declare {what}")]
    IncompleteRequest { slot: String, what: &'static str },

    #[error("Invalid {context}: {message}")]
    Invalid { context: String, message: String },
}

impl FlowError {
    pub(crate) fn invalid(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            context: context.into(),
            message: message.into(),
        }
    }
}
