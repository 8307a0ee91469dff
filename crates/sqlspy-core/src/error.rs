//! Error types for sqlspy

use thiserror::Error;

/// Error type for operations on the client API and the recording double
#[derive(Error, Debug)]
pub enum SqlSpyError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    /// Operation attempted on a resource that was already closed or freed
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for sqlspy operations
pub type Result<T> = std::result::Result<T, SqlSpyError>;
