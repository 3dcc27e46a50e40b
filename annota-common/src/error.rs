//! Common error types for Annota

use thiserror::Error;

/// Common result type for Annota operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the workstation crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session store read/write failure
    #[error("Store error: {0}")]
    Store(String),

    /// Serialized value in the store could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
