//! Initiative repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Initiative, InitiativeStatus, Revision};

/// Repository interface for Initiative persistence.
///
/// Implementations store the initiative row and its full revision ledger
/// atomically. Writes are guarded by optimistic versioning: `save` succeeds
/// only when the stored version equals `initiative.version` (0 meaning the
/// initiative must not exist yet) and leaves the stored version at
/// `initiative.version + 1`. A lost race is reported as
/// `DomainError::ConcurrencyConflict`.
#[async_trait]
pub trait InitiativeRepository: Send + Sync {
    /// Insert or update an initiative together with its revisions.
    async fn save(&self, initiative: &Initiative) -> DomainResult<()>;

    /// Get an initiative with its revisions by ID.
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Initiative>>;

    /// All initiatives, newest first.
    async fn find_all(&self) -> DomainResult<Vec<Initiative>>;

    /// All initiatives in a given status, newest first.
    async fn find_by_status(&self, status: InitiativeStatus) -> DomainResult<Vec<Initiative>>;

    /// Revisions of one initiative in chronological order.
    async fn find_revisions(&self, initiative_id: Uuid) -> DomainResult<Vec<Revision>>;
}
