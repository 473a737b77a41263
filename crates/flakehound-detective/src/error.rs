//! Error taxonomy of a detection pass

use flakehound_core::{ConfigError, ValidationError};
use flakehound_embed::EmbedError;
use flakehound_store::StoreError;
use thiserror::Error;

/// One pass surfaces exactly one of these; the core never recovers or
/// retries on its own.
#[derive(Error, Debug)]
pub enum DetectiveError {
    /// Invalid configuration, raised at construction.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed input record or invalid embedding.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The embedding provider failed; the batch index is zero-based.
    #[error("embedding provider failed on batch {batch}: {source}")]
    Provider {
        batch: usize,
        #[source]
        source: EmbedError,
    },

    /// A storage collaborator failed on fetch or save.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Externally requested termination; no partial results were surfaced.
    #[error("detection pass cancelled")]
    Cancelled,
}
