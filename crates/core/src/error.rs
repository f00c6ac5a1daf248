//! Error types shared across the workspace

use thiserror::Error;

/// Core errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Domain file not found: {path}: {message}")]
    DomainFile { path: String, message: String },

    #[error("Failed to parse domain: {0}")]
    DomainParse(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("NLU classification failed: {0}")]
    Nlu(String),

    #[error("Outbound channel failed: {0}")]
    Channel(String),
}

pub type Result<T> = std::result::Result<T, Error>;
