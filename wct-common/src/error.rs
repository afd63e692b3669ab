//! Common error types for WordCamp Talks

use thiserror::Error;

/// Common result type for WordCamp Talks operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the service
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored blob could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Talk cannot be selected while its author has no biography
    #[error("Biography required before selecting talk {0}")]
    BioRequired(i64),

    /// Optimistic update kept losing against concurrent writers
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),
}
