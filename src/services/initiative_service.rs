//! Initiative service: the lifecycle controller.
//!
//! Every mutating operation loads the aggregate, applies one change, and
//! performs exactly one repository write. Only after that write commits is
//! the latest snapshot mirrored into the similarity index; a failed mirror
//! is logged and never undoes the write.

use std::sync::Arc;

use uuid::Uuid;

use super::revision_ledger::append_revision;
use super::task_generator::TaskGenerator;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{validate_task_tree, Initiative, InitiativeStatus, RevisionKind, Task};
use crate::domain::ports::{InitiativePayload, InitiativeRepository};

pub struct InitiativeService<R: InitiativeRepository> {
    repository: Arc<R>,
    generator: TaskGenerator,
}

impl<R: InitiativeRepository> InitiativeService<R> {
    pub fn new(repository: Arc<R>, generator: TaskGenerator) -> Self {
        Self {
            repository,
            generator,
        }
    }

    /// Create an initiative with a generated suggestion and start its review.
    ///
    /// Nothing is stored when generation fails.
    pub async fn create_initiative(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> DomainResult<Initiative> {
        let mut initiative = Initiative::new(title, description);
        if initiative.title.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "initiative title must not be empty".to_string(),
            ));
        }

        let generated = self.generator.generate(&initiative.source_text()).await?;
        append_revision(&mut initiative, RevisionKind::Suggestion, generated.tasks)?;
        initiative.transition_to(InitiativeStatus::Reviewing)?;

        self.persist(&mut initiative).await?;

        tracing::info!(
            initiative_id = %initiative.id,
            total_tasks = generated.metadata.total_tasks,
            similar = generated.metadata.similar_initiatives,
            "initiative created and under review"
        );
        Ok(initiative)
    }

    /// Record a reviewer's edit of the task list.
    pub async fn revise_tasks(&self, id: Uuid, tasks: Vec<Task>) -> DomainResult<Initiative> {
        let mut initiative = self.load(id).await?;

        if initiative.status != InitiativeStatus::Reviewing {
            return Err(DomainError::InvalidState {
                status: initiative.status,
                operation: "revise",
                reason: "tasks can only be revised while reviewing".to_string(),
            });
        }

        validate_user_tasks(&tasks)?;
        append_revision(&mut initiative, RevisionKind::UserEdit, tasks)?;
        self.persist(&mut initiative).await?;

        tracing::info!(
            initiative_id = %initiative.id,
            revisions = initiative.revisions.len(),
            "tasks revised"
        );
        Ok(initiative)
    }

    /// Accept a final task list and approve the initiative.
    ///
    /// Re-finalizing an approved initiative appends another final revision
    /// and keeps it approved.
    pub async fn finalize(&self, id: Uuid, tasks: Vec<Task>) -> DomainResult<Initiative> {
        let mut initiative = self.load(id).await?;

        if initiative.suggestion().is_none() {
            return Err(DomainError::InvalidState {
                status: initiative.status,
                operation: "finalize",
                reason: "no suggestion revision exists".to_string(),
            });
        }
        if initiative.status == InitiativeStatus::Uploaded {
            return Err(DomainError::InvalidState {
                status: initiative.status,
                operation: "finalize",
                reason: "initiative already uploaded".to_string(),
            });
        }

        validate_user_tasks(&tasks)?;
        append_revision(&mut initiative, RevisionKind::Final, tasks)?;
        if initiative.status == InitiativeStatus::Reviewing {
            initiative.transition_to(InitiativeStatus::Approved)?;
        }
        self.persist(&mut initiative).await?;

        tracing::info!(
            initiative_id = %initiative.id,
            accuracy = ?initiative.latest_revision().and_then(|r| r.metadata.accuracy),
            "initiative approved"
        );
        Ok(initiative)
    }

    /// Record that the approved breakdown was published to the tracker.
    pub async fn mark_uploaded(
        &self,
        id: Uuid,
        project_key: impl Into<String>,
        epic_link: Option<String>,
    ) -> DomainResult<Initiative> {
        let project_key = project_key.into();
        let mut initiative = self.load(id).await?;

        if initiative.status != InitiativeStatus::Approved {
            return Err(DomainError::InvalidState {
                status: initiative.status,
                operation: "upload",
                reason: "only approved initiatives can be uploaded".to_string(),
            });
        }
        if project_key.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "project key must not be empty".to_string(),
            ));
        }

        initiative.transition_to(InitiativeStatus::Uploaded)?;
        initiative.jira_project_key = Some(project_key);
        initiative.jira_epic_link = epic_link;
        self.persist(&mut initiative).await?;

        tracing::info!(
            initiative_id = %initiative.id,
            project_key = initiative.jira_project_key.as_deref().unwrap_or_default(),
            "initiative uploaded"
        );
        Ok(initiative)
    }

    pub async fn get_initiative(&self, id: Uuid) -> DomainResult<Initiative> {
        self.load(id).await
    }

    pub async fn list_all(&self) -> DomainResult<Vec<Initiative>> {
        self.repository.find_all().await
    }

    pub async fn list_by_status(&self, status: InitiativeStatus) -> DomainResult<Vec<Initiative>> {
        self.repository.find_by_status(status).await
    }

    async fn load(&self, id: Uuid) -> DomainResult<Initiative> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(DomainError::InitiativeNotFound(id))
    }

    /// The single write of a mutation, followed by the best-effort mirror.
    async fn persist(&self, initiative: &mut Initiative) -> DomainResult<()> {
        self.repository.save(initiative).await?;
        initiative.version += 1;
        self.mirror(initiative).await;
        Ok(())
    }

    async fn mirror(&self, initiative: &Initiative) {
        let mut payload = InitiativePayload::new(
            initiative.id.to_string(),
            initiative.title.clone(),
            initiative.description.clone(),
        );
        payload.status = Some(initiative.status.as_str().to_string());
        if let Some(latest) = initiative.latest_revision() {
            payload.tasks = latest.tasks.clone();
        }

        if let Err(e) = self.generator.retriever().remember(&payload).await {
            tracing::warn!(
                initiative_id = %initiative.id,
                error = %e,
                "failed to mirror initiative into similarity index"
            );
        }
    }
}

fn validate_user_tasks(tasks: &[Task]) -> DomainResult<()> {
    validate_task_tree(tasks).map_err(|e| DomainError::ValidationFailed(e.to_string()))
}
