//! Embedding provider trait and a deterministic offline implementation.

use async_trait::async_trait;

use crate::error::Result;

/// Maps text to fixed-width numeric vectors.
///
/// Implementations must return vectors of stable, consistent width for a
/// given configuration; the knowledge store rejects mixed widths.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            crate::error::LorebaseError::Provider(format!(
                "{} returned no embedding for a single input",
                self.name()
            ))
        })
    }
}

/// Deterministic embedding provider for tests and offline runs.
///
/// Identical texts always produce identical unit vectors; distinct texts
/// almost surely differ. No network, no state.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 8 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};

        let mut vector = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let raw = hasher.finish();
            // Map the hash onto [-1, 1]
            vector.push((raw as f64 / u64::MAX as f64 * 2.0 - 1.0) as f32);
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "Hello world".to_string(),
            "Goodbye world".to_string(),
            "Hello world".to_string(),
        ];

        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second, "mock embeddings should be deterministic");
        assert_eq!(first[0], first[2], "identical text, identical embedding");
        assert_ne!(first[0], first[1], "different text, different embedding");
    }

    #[tokio::test]
    async fn test_mock_embeddings_are_unit_vectors() {
        let provider = MockEmbeddingProvider::with_dimensions(16);
        let vector = provider.embed_one("some text").await.unwrap();
        assert_eq!(vector.len(), 16);
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
