//! Embedding orchestration.
//!
//! Feeds failure contexts to the provider in bounded batches with a pause
//! between successive batches, reassembles results in input order, and
//! validates the returned vectors before they reach clustering.

use std::sync::Arc;
use std::time::Duration;

use flakehound_core::{build_embedding_context, EmbeddedFailure, TestFailure, ValidationError};
use flakehound_embed::EmbeddingProvider;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::DetectiveError;

/// Batches, paces, and validates embedding requests.
pub struct EmbeddingOrchestrator {
    provider: Arc<dyn EmbeddingProvider>,
    max_batch_size: usize,
    batch_delay: Duration,
}

impl EmbeddingOrchestrator {
    /// `max_batch_size` must be at least 1 (enforced by config validation).
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        max_batch_size: usize,
        batch_delay: Duration,
    ) -> Self {
        EmbeddingOrchestrator {
            provider,
            max_batch_size,
            batch_delay,
        }
    }

    /// Embed every failure's context, preserving input order.
    ///
    /// Empty input returns immediately without touching the provider. A
    /// provider error aborts the pass carrying the zero-based batch index;
    /// partial results are discarded. Cancellation is observed before each
    /// batch and during the inter-batch pause.
    pub async fn embed_failures(
        &self,
        failures: Vec<TestFailure>,
        cancel: &CancellationToken,
    ) -> Result<Vec<EmbeddedFailure>, DetectiveError> {
        if failures.is_empty() {
            return Ok(Vec::new());
        }

        let contexts: Vec<String> = failures.iter().map(build_embedding_context).collect();
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(contexts.len());

        for (batch, chunk) in contexts.chunks(self.max_batch_size).enumerate() {
            if batch > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(DetectiveError::Cancelled),
                    _ = tokio::time::sleep(self.batch_delay) => {}
                }
            }
            if cancel.is_cancelled() {
                return Err(DetectiveError::Cancelled);
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(DetectiveError::Cancelled),
                result = self.provider.generate_embeddings(chunk) => result,
            };
            let batch_vectors =
                result.map_err(|source| DetectiveError::Provider { batch, source })?;

            if batch_vectors.len() != chunk.len() {
                return Err(ValidationError::CountMismatch {
                    expected: chunk.len(),
                    got: batch_vectors.len(),
                }
                .into());
            }

            debug!(batch, size = chunk.len(), "embedded batch");
            vectors.extend(batch_vectors);
        }

        validate_embeddings(&vectors)?;

        Ok(failures
            .into_iter()
            .zip(vectors)
            .map(|(failure, embedding)| EmbeddedFailure { failure, embedding })
            .collect())
    }
}

/// Post-condition check on provider output: vectors are non-empty, share
/// one dimensionality, and contain only finite numbers.
fn validate_embeddings(vectors: &[Vec<f32>]) -> Result<(), ValidationError> {
    let expected = vectors.first().map(Vec::len).unwrap_or_default();
    for (index, vector) in vectors.iter().enumerate() {
        if vector.is_empty() {
            return Err(ValidationError::EmptyEmbedding { index });
        }
        if vector.len() != expected {
            return Err(ValidationError::DimensionMismatch {
                index,
                got: vector.len(),
                expected,
            });
        }
        if vector.iter().any(|component| !component.is_finite()) {
            return Err(ValidationError::NonFinite { index });
        }
    }
    Ok(())
}
