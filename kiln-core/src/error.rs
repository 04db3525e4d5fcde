//! Error types for Kiln

use thiserror::Error;

/// Result type for Kiln operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Kiln
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error, including failures while streaming a resource body
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Application could not be created or initialized
    #[error("Application error: {0}")]
    Application(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
