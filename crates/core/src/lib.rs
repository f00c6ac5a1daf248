//! Core types and collaborator traits for the flowbot dialogue manager
//!
//! This crate provides the foundation shared by all other crates:
//! - The domain registry (recognised intents, entities and slots)
//! - Runtime conversation values (intent, entities, slots)
//! - The outbound message type
//! - Collaborator traits (NLU oracle, outbound channel)
//! - Error types

pub mod domain;
pub mod error;
pub mod traits;
pub mod types;

pub use domain::Domain;
pub use error::{Error, Result};
pub use traits::{NluOracle, NluResult, OutboundChannel};
pub use types::{
    Entity, Intent, MessageOutput, SlotAssignments, Slots, DEFAULT_INTENT, REQUEST_SLOT,
};
