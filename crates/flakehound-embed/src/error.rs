//! Error types for embedding providers

use thiserror::Error;

/// Errors surfaced by an embedding provider
#[derive(Error, Debug)]
pub enum EmbedError {
    /// No credential was supplied and none was found in the environment
    #[error("API key is required")]
    MissingApiKey,

    /// Transport-level request failure
    #[error("embedding request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status
    #[error("embedding service returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// The service answered 200 but the payload does not fit the contract
    #[error("embedding response malformed: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for EmbedError {
    fn from(err: reqwest::Error) -> Self {
        EmbedError::Request(err.to_string())
    }
}
