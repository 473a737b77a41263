//! Deterministic offline embedder (testing and dry runs)

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::EmbedError;
use crate::provider::EmbeddingProvider;

/// Digest-seeded embedder.
///
/// Each text maps to a unit vector derived from SHA-256 of the text, so the
/// mapping is stable across processes and platforms: identical texts land
/// on identical vectors (distance 0) while distinct texts land on
/// effectively unrelated directions. That is exactly the geometry the
/// clustering tests need — no network, no credential.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    /// Embedder producing vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        MockEmbedder { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut components = Vec::with_capacity(self.dimension);
        let mut chunk: u32 = 0;
        while components.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(chunk.to_be_bytes());
            hasher.update(text.as_bytes());
            for byte in hasher.finalize() {
                if components.len() == self.dimension {
                    break;
                }
                components.push((f32::from(byte) - 127.5) / 127.5);
            }
            chunk += 1;
        }

        let norm = components.iter().map(|c| c * c).sum::<f32>().sqrt();
        if norm > 0.0 {
            for component in &mut components {
                *component /= norm;
            }
        }
        components
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        MockEmbedder::new(32)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identical_texts_map_to_identical_vectors() {
        let embedder = MockEmbedder::default();
        let texts = vec!["same context".to_string(), "same context".to_string()];
        let vectors = embedder.generate_embeddings(&texts).await.unwrap();
        assert_eq!(vectors[0], vectors[1]);
    }

    #[tokio::test]
    async fn test_distinct_texts_are_far_apart_under_cosine() {
        let embedder = MockEmbedder::default();
        let texts = vec!["login failure".to_string(), "checkout timeout".to_string()];
        let vectors = embedder.generate_embeddings(&texts).await.unwrap();

        let dot: f32 = vectors[0].iter().zip(&vectors[1]).map(|(a, b)| a * b).sum();
        // Unit vectors: cosine similarity is the dot product.
        assert!(dot.abs() < 0.85, "similarity {dot} unexpectedly high");
    }

    #[tokio::test]
    async fn test_dimension_and_unit_norm() {
        let embedder = MockEmbedder::new(48);
        let vectors = embedder
            .generate_embeddings(&["abc".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors[0].len(), 48);

        let norm: f32 = vectors[0].iter().map(|c| c * c).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_stable_across_calls() {
        let embedder = MockEmbedder::default();
        let texts = vec!["ctx".to_string()];
        let a = embedder.generate_embeddings(&texts).await.unwrap();
        let b = embedder.generate_embeddings(&texts).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_output() {
        let embedder = MockEmbedder::default();
        assert!(embedder.generate_embeddings(&[]).await.unwrap().is_empty());
    }
}
