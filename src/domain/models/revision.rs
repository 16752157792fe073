//! Revision domain model.
//!
//! A revision is an immutable snapshot of an initiative's full task list,
//! tagged with how it came to exist and with metrics derived from it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{count_tasks, total_story_points, Task};

/// How a revision came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    /// Generated by the language model
    Suggestion,
    /// Edited by a reviewer
    UserEdit,
    /// Accepted by a reviewer as the final breakdown
    Final,
}

impl RevisionKind {
    pub const ALL: [Self; 3] = [Self::Suggestion, Self::UserEdit, Self::Final];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suggestion => "suggestion",
            Self::UserEdit => "user_edit",
            Self::Final => "final",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "suggestion" => Some(Self::Suggestion),
            "user_edit" | "useredit" => Some(Self::UserEdit),
            "final" => Some(Self::Final),
            _ => None,
        }
    }
}

impl fmt::Display for RevisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics derived from a revision's task tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionMetadata {
    pub total_tasks: usize,
    pub total_story_points: u32,
    /// Closeness to the initial suggestion, only on final revisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Distance from the preceding revision, on user edits and finals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_distance: Option<usize>,
}

/// Comparison scores attached to a new revision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RevisionScores {
    pub accuracy: Option<f64>,
    pub edit_distance: Option<usize>,
}

/// Immutable snapshot of an initiative's task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: RevisionKind,
    pub tasks: Vec<Task>,
    pub metadata: RevisionMetadata,
}

impl Revision {
    /// Create a revision, deriving task and point totals from `tasks`.
    pub fn new(
        kind: RevisionKind,
        tasks: Vec<Task>,
        scores: RevisionScores,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let metadata = RevisionMetadata {
            total_tasks: count_tasks(&tasks),
            total_story_points: total_story_points(&tasks),
            accuracy: scores.accuracy,
            edit_distance: scores.edit_distance,
        };

        Self {
            id: Uuid::new_v4(),
            timestamp,
            kind,
            tasks,
            metadata,
        }
    }

    /// True when the stored totals match the task tree.
    pub fn totals_consistent(&self) -> bool {
        self.metadata.total_tasks == count_tasks(&self.tasks)
            && self.metadata.total_story_points == total_story_points(&self.tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::task::{TaskKind, TaskPriority};

    #[test]
    fn test_new_revision_derives_totals() {
        let tasks = vec![Task::new(TaskKind::Story, "Design auth flow", TaskPriority::High, 5)
            .with_subtask(Task::new(TaskKind::Task, "Pick provider", TaskPriority::Medium, 3))];

        let revision = Revision::new(
            RevisionKind::UserEdit,
            tasks,
            RevisionScores {
                accuracy: None,
                edit_distance: Some(1),
            },
            Utc::now(),
        );

        assert_eq!(revision.metadata.total_tasks, 2);
        assert_eq!(revision.metadata.total_story_points, 8);
        assert_eq!(revision.metadata.edit_distance, Some(1));
        assert!(revision.totals_consistent());
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in RevisionKind::ALL {
            assert_eq!(RevisionKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(RevisionKind::from_str("draft"), None);
    }

    #[test]
    fn test_metadata_omits_absent_scores() {
        let revision = Revision::new(RevisionKind::Suggestion, vec![], RevisionScores::default(), Utc::now());
        let value = serde_json::to_value(&revision.metadata).unwrap();
        assert_eq!(value["totalTasks"], 0);
        assert!(value.get("accuracy").is_none());
        assert!(value.get("editDistance").is_none());
    }
}
