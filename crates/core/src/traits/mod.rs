//! Collaborator traits
//!
//! The dialogue core talks to two external collaborators: the NLU
//! classifier (treated as an oracle) and the outbound message channel.
//! Both are potentially slow (network, model inference) and therefore
//! async; both are object-safe so hosts can swap implementations.

mod channel;
mod nlu;

pub use channel::OutboundChannel;
pub use nlu::{NluOracle, NluResult};
