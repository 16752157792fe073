//! Text generation port (language model).

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// A language model that turns a prompt into response text.
///
/// Implementations report every transport or model failure as
/// `DomainError::Generation`. Any retry policy lives in the implementation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name (e.g., "anthropic").
    fn name(&self) -> &'static str;

    /// Generate a response for a single prompt.
    async fn generate(&self, prompt: &str) -> DomainResult<String>;
}
