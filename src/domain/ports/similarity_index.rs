//! Similarity index port for historical initiatives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::Task;

/// What the index stores about a past initiative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiativePayload {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Latest task snapshot, when mirrored from a live initiative
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
}

impl InitiativePayload {
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            category: None,
            priority: None,
            status: None,
            tasks: Vec::new(),
        }
    }

    /// Text the index embeds for this payload.
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}", self.title, self.description)
    }
}

/// A search hit with its similarity score (higher is closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPayload {
    pub payload: InitiativePayload,
    pub score: f32,
}

/// Vector index over past initiatives.
///
/// Failures are reported as `DomainError::Retrieval`. An empty index is a
/// normal state and yields an empty search result.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Backend name (e.g., "qdrant", "null").
    fn name(&self) -> &'static str;

    /// Up to `limit` entries most similar to `query`, best first.
    async fn search(&self, query: &str, limit: usize) -> DomainResult<Vec<ScoredPayload>>;

    /// Insert or replace the entry `id`, embedding `text`.
    async fn upsert(&self, id: &str, text: &str, payload: &InitiativePayload) -> DomainResult<()>;
}
