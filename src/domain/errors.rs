//! Domain errors for the SmartSpec initiative engine.

use thiserror::Error;
use uuid::Uuid;

use super::models::InitiativeStatus;

/// Domain-level errors that can occur in the SmartSpec system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Initiative not found: {0}")]
    InitiativeNotFound(Uuid),

    #[error("Cannot {operation} initiative in status {status}: {reason}")]
    InvalidState {
        status: InitiativeStatus,
        operation: &'static str,
        reason: String,
    },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStateTransition {
        from: InitiativeStatus,
        to: InitiativeStatus,
    },

    #[error("Task generation failed: {0}")]
    Generation(String),

    #[error("Historical retrieval failed: {0}")]
    Retrieval(String),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: String, id: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DomainError {
    /// Conflict on an initiative row.
    pub fn initiative_conflict(id: Uuid) -> Self {
        Self::ConcurrencyConflict {
            entity: "initiative".to_string(),
            id: id.to_string(),
        }
    }

    /// Whether a caller may reasonably retry the same operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Generation(_) | Self::Retrieval(_) | Self::ConcurrencyConflict { .. }
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
