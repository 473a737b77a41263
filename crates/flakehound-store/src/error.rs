//! Error types for the persistence layer

use thiserror::Error;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the storage backends
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend connection error
    #[error("store connection failed: {0}")]
    Connection(String),

    /// Backend query error
    #[error("store query failed: {0}")]
    Query(String),

    /// Filesystem error
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("store serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("store schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
