//! Historical retriever: similar past initiatives as generation context.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{InitiativePayload, ScoredPayload, SimilarityIndex};

/// Shown in place of the context block when nothing similar is indexed.
pub const NO_SIMILAR_INITIATIVES: &str = "No similar initiatives found.";

/// Thin wrapper around a [`SimilarityIndex`] with a per-call deadline.
#[derive(Clone)]
pub struct HistoricalRetriever {
    index: Arc<dyn SimilarityIndex>,
    timeout: Duration,
}

impl HistoricalRetriever {
    pub fn new(index: Arc<dyn SimilarityIndex>, timeout: Duration) -> Self {
        Self { index, timeout }
    }

    pub fn index(&self) -> &Arc<dyn SimilarityIndex> {
        &self.index
    }

    /// At most `k` matches for `text`, best score first.
    ///
    /// An empty index yields an empty vector. Backend failures and an
    /// elapsed deadline are `DomainError::Retrieval`.
    pub async fn find_similar(&self, text: &str, k: usize) -> DomainResult<Vec<ScoredPayload>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut matches = tokio::time::timeout(self.timeout, self.index.search(text, k))
            .await
            .map_err(|_| {
                DomainError::Retrieval(format!(
                    "{} search timed out after {:?}",
                    self.index.name(),
                    self.timeout
                ))
            })??;

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(k);

        tracing::debug!(
            backend = self.index.name(),
            requested = k,
            found = matches.len(),
            "retrieved similar initiatives"
        );

        Ok(matches)
    }

    /// Index `payload` under its id so later searches can find it.
    pub async fn remember(&self, payload: &InitiativePayload) -> DomainResult<()> {
        let text = payload.embedding_text();
        tokio::time::timeout(self.timeout, self.index.upsert(&payload.id, &text, payload))
            .await
            .map_err(|_| {
                DomainError::Retrieval(format!(
                    "{} upsert timed out after {:?}",
                    self.index.name(),
                    self.timeout
                ))
            })?
    }
}

/// Render matches as the context block handed to the generator.
pub fn format_context(matches: &[ScoredPayload]) -> String {
    if matches.is_empty() {
        return NO_SIMILAR_INITIATIVES.to_string();
    }

    matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let p = &m.payload;
            format!(
                "{}. {}\n   Description: {}\n   Category: {}\n   Priority: {}\n   Status: {}\n   Similarity: {:.2}",
                i + 1,
                p.title,
                p.description,
                p.category.as_deref().unwrap_or("n/a"),
                p.priority.as_deref().unwrap_or("n/a"),
                p.status.as_deref().unwrap_or("n/a"),
                m.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
