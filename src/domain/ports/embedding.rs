//! Embedding provider port for semantic vector generation.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Converts text into a dense vector for similarity search.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai").
    fn name(&self) -> &'static str;

    /// Embedding dimension for this provider/model.
    fn dimension(&self) -> usize;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>>;
}
