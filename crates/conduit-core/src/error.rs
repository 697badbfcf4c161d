//! Error types for Conduit declarations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("duplicate definition: {0}")]
    Duplicate(String),

    #[error("unknown stack: {0}")]
    UnknownStack(String),

    #[error("cycle detected in stack dependencies: {0}")]
    CycleDetected(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
