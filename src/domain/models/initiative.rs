//! Initiative domain model.
//!
//! An initiative is a business-level improvement request. It owns an
//! append-only ledger of revisions and moves forward through
//! `Draft -> Reviewing -> Approved -> Uploaded`, never backwards.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::revision::{Revision, RevisionKind};
use crate::domain::errors::{DomainError, DomainResult};

/// Lifecycle status of an initiative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InitiativeStatus {
    /// Created, no suggestion attached yet
    Draft,
    /// Suggestion attached, under human review
    Reviewing,
    /// A final revision was accepted
    Approved,
    /// Published to the external tracker
    Uploaded,
}

impl Default for InitiativeStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl InitiativeStatus {
    pub const ALL: [Self; 4] = [Self::Draft, Self::Reviewing, Self::Approved, Self::Uploaded];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Reviewing => "Reviewing",
            Self::Approved => "Approved",
            Self::Uploaded => "Uploaded",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "reviewing" => Some(Self::Reviewing),
            "approved" => Some(Self::Approved),
            "uploaded" => Some(Self::Uploaded),
            _ => None,
        }
    }

    /// Only single forward steps are legal.
    pub fn can_transition_to(&self, new_status: Self) -> bool {
        matches!(
            (self, new_status),
            (Self::Draft, Self::Reviewing)
                | (Self::Reviewing, Self::Approved)
                | (Self::Approved, Self::Uploaded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Uploaded)
    }
}

impl fmt::Display for InitiativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An initiative and its revision ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initiative {
    /// Unique identifier
    pub id: Uuid,
    /// Short human-readable title
    pub title: String,
    /// Free-text description of the initiative
    pub description: String,
    /// Current lifecycle status
    pub status: InitiativeStatus,
    /// Chronological, append-only revision ledger
    pub revisions: Vec<Revision>,
    /// Tracker project the breakdown was published to
    pub jira_project_key: Option<String>,
    /// Tracker epic the breakdown was published under
    pub jira_epic_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of committed writes, 0 until first stored
    pub version: u64,
}

impl Initiative {
    /// Create a new draft initiative.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            status: InitiativeStatus::Draft,
            revisions: Vec::new(),
            jira_project_key: None,
            jira_epic_link: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Text fed to generation and to the similarity index.
    pub fn source_text(&self) -> String {
        format!("{}\n{}", self.title, self.description)
    }

    /// The initial suggestion, if one exists.
    pub fn suggestion(&self) -> Option<&Revision> {
        self.revisions
            .first()
            .filter(|r| r.kind == RevisionKind::Suggestion)
    }

    pub fn latest_revision(&self) -> Option<&Revision> {
        self.revisions.last()
    }

    pub fn first_final(&self) -> Option<&Revision> {
        self.revisions.iter().find(|r| r.kind == RevisionKind::Final)
    }

    pub fn latest_final(&self) -> Option<&Revision> {
        self.revisions.iter().rev().find(|r| r.kind == RevisionKind::Final)
    }

    /// The accepted breakdown if there is one, otherwise the newest snapshot.
    pub fn effective_revision(&self) -> Option<&Revision> {
        self.latest_final().or_else(|| self.latest_revision())
    }

    /// Append a revision to the ledger.
    ///
    /// The first revision must be a suggestion and timestamps stay strictly
    /// increasing: a revision stamped at or before its predecessor is moved
    /// one microsecond past it.
    pub fn push_revision(&mut self, mut revision: Revision) -> DomainResult<()> {
        match self.revisions.last() {
            None if revision.kind != RevisionKind::Suggestion => {
                return Err(DomainError::InvalidState {
                    status: self.status,
                    operation: "record revision on",
                    reason: "the first revision must be a suggestion".to_string(),
                });
            }
            Some(last) if revision.timestamp <= last.timestamp => {
                revision.timestamp = last.timestamp + Duration::microseconds(1);
            }
            _ => {}
        }

        self.updated_at = revision.timestamp.max(self.updated_at);
        self.revisions.push(revision);
        Ok(())
    }

    /// Advance the lifecycle status by one step.
    pub fn transition_to(&mut self, new_status: InitiativeStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(new_status) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: new_status,
            });
        }

        if new_status == InitiativeStatus::Reviewing && self.suggestion().is_none() {
            return Err(DomainError::InvalidState {
                status: self.status,
                operation: "start review of",
                reason: "no suggestion revision attached".to_string(),
            });
        }

        if matches!(new_status, InitiativeStatus::Approved | InitiativeStatus::Uploaded)
            && self.first_final().is_none()
        {
            return Err(DomainError::InvalidState {
                status: self.status,
                operation: "approve",
                reason: "no final revision attached".to_string(),
            });
        }

        self.status = new_status;
        self.updated_at = Utc::now().max(self.updated_at);
        Ok(())
    }

    /// Elapsed time from creation to the first final revision.
    pub fn time_to_approval(&self) -> Option<Duration> {
        self.first_final().map(|r| r.timestamp - self.created_at)
    }

    /// Check the ledger invariants. Used by the repository when loading rows.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("initiative title must not be empty".to_string());
        }

        if self.status != InitiativeStatus::Draft && self.suggestion().is_none() {
            return Err(format!(
                "initiative in status {} has no initial suggestion",
                self.status
            ));
        }

        if self
            .revisions
            .windows(2)
            .any(|pair| pair[0].timestamp >= pair[1].timestamp)
        {
            return Err("revisions are not in strictly ascending timestamp order".to_string());
        }

        if matches!(
            self.status,
            InitiativeStatus::Approved | InitiativeStatus::Uploaded
        ) && self.first_final().is_none()
        {
            return Err(format!("initiative in status {} has no final revision", self.status));
        }

        Ok(())
    }
}
