//! Null similarity index implementation.
//!
//! Used when no index backend is configured: searches find nothing and
//! upserts are dropped, so generation runs without historical context.

use async_trait::async_trait;

use super::similarity_index::{InitiativePayload, ScoredPayload, SimilarityIndex};
use crate::domain::errors::DomainResult;

/// A no-op index that stores nothing.
#[derive(Debug, Clone, Default)]
pub struct NullSimilarityIndex;

impl NullSimilarityIndex {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SimilarityIndex for NullSimilarityIndex {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn search(&self, _query: &str, _limit: usize) -> DomainResult<Vec<ScoredPayload>> {
        Ok(Vec::new())
    }

    async fn upsert(&self, _id: &str, _text: &str, _payload: &InitiativePayload) -> DomainResult<()> {
        Ok(())
    }
}
