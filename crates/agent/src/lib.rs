//! Conversation driver
//!
//! The re-entrant reducer that turns user messages into responses:
//! - [`ConversationState`] — the running state of one user's dialogue
//! - [`Controller`] — the per-turn reducer over the flow map
//! - [`Action`] / [`ActionRegistry`] — named callable effects, with the
//!   required `default` and `restart` built-ins
//! - [`UserConversations`] — the bounded in-memory working set backed by
//!   the durable conversation log

pub mod actions;
pub mod controller;
pub mod conversations;
pub mod error;
pub mod state;

pub use actions::{Action, ActionRegistry, DefaultAction, RestartAction, FALLBACK_PROMPT};
pub use controller::{Controller, LOOP_MAX};
pub use conversations::UserConversations;
pub use error::AgentError;
pub use state::ConversationState;
