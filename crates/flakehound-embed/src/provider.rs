//! Embedding provider trait.

use async_trait::async_trait;

use crate::error::EmbedError;

/// A service turning texts into embedding vectors.
///
/// Guarantees required of implementations:
/// - The output has exactly one vector per input text, in input order.
/// - All vectors of one call share the same dimensionality.
/// - Retries, if any, happen inside the implementation; the caller treats
///   any surfaced error as fatal for its pass.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed every text, preserving order.
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}
