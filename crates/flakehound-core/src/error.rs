//! Error types for the detection domain

use thiserror::Error;

/// Invalid detection configuration. Raised at construction; fatal for the
/// pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("epsilon must be greater than 0 (got {0})")]
    Epsilon(f64),

    #[error("minPoints must be at least 1")]
    MinPoints,

    #[error("minClusterSize must be at least 1")]
    MinClusterSize,

    #[error("maxClusters must be at least 1 when specified")]
    MaxClusters,

    #[error("timeWindow days must be a positive integer")]
    TimeWindow,

    #[error("maxBatchSize must be at least 1")]
    MaxBatchSize,

    #[error("unknown distance metric: {0} (expected cosine or euclidean)")]
    UnknownDistance(String),
}

/// Malformed input record or invalid embedding. Raised from validation and
/// embedding post-conditions; fatal for the pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field of a failure record is empty.
    #[error("failure record {index} ({id}) is missing required field `{field}`")]
    MissingField {
        index: usize,
        id: String,
        field: &'static str,
    },

    /// The provider returned a different number of vectors than requested.
    #[error("expected {expected} embeddings, got {got}")]
    CountMismatch { expected: usize, got: usize },

    /// An embedding vector has no components.
    #[error("embedding {index} is empty")]
    EmptyEmbedding { index: usize },

    /// An embedding vector disagrees with the dimensionality of the pass.
    #[error("embedding {index} has dimension {got}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        got: usize,
        expected: usize,
    },

    /// An embedding component is NaN or infinite.
    #[error("embedding {index} contains a non-finite component")]
    NonFinite { index: usize },

    /// Distance was requested between vectors of different lengths.
    #[error("cannot compare vectors of different lengths ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
}
