//! Error types.

use thiserror::Error;

/// Library error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or missing caller input (empty search query, bad export
    /// format, ownership mismatch in a bulk delete, ...)
    #[error("validation error: {0}")]
    Validation(String),

    /// Record absent, or owned by a different user. Ownership misses are
    /// reported as not-found so callers cannot probe for existence.
    #[error("not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
