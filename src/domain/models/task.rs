//! Task domain model.
//!
//! Tasks are value objects: a revision owns an ordered tree of them and
//! they have no identity beyond their position in that tree. Trees coming
//! from the language model or from a reviewer are validated against the
//! same schema and size bounds before they are attached to a revision.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum nesting depth of a task tree (top-level tasks are depth 1).
pub const MAX_TASK_DEPTH: usize = 4;

/// Maximum number of task nodes in a single revision snapshot.
pub const MAX_TASK_NODES: usize = 200;

/// Inclusive story point bounds.
pub const MIN_STORY_POINTS: u32 = 1;
pub const MAX_STORY_POINTS: u32 = 13;

/// Kind of work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Story,
    Task,
    Bug,
}

impl TaskKind {
    pub const ALL: [Self; 3] = [Self::Story, Self::Task, Self::Bug];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Story => "Story",
            Self::Task => "Task",
            Self::Bug => "Bug",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority of a work item, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskPriority {
    Highest,
    High,
    Medium,
    Low,
    Lowest,
}

impl TaskPriority {
    pub const ALL: [Self; 5] = [
        Self::Highest,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Lowest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Highest => "Highest",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Lowest => "Lowest",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single work item, possibly with subtasks.
///
/// Serialized with the field names the task breakdown format uses
/// (`type`, `storyPoints`), so generated JSON and stored snapshots share
/// one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub summary: String,
    pub description: String,
    pub priority: TaskPriority,
    pub story_points: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Task>,
}

impl Task {
    pub fn new(
        kind: TaskKind,
        summary: impl Into<String>,
        priority: TaskPriority,
        story_points: u32,
    ) -> Self {
        Self {
            kind,
            summary: summary.into(),
            description: String::new(),
            priority,
            story_points,
            subtasks: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_subtask(mut self, subtask: Task) -> Self {
        self.subtasks.push(subtask);
        self
    }

    /// True when the task's own fields (not its subtasks) match `other`.
    pub fn same_fields(&self, other: &Task) -> bool {
        self.kind == other.kind
            && self.priority == other.priority
            && self.story_points == other.story_points
            && self.summary == other.summary
            && self.description == other.description
    }
}

/// Number of nodes in a task forest, counting subtasks recursively.
pub fn count_tasks(tasks: &[Task]) -> usize {
    tasks.iter().map(|t| 1 + count_tasks(&t.subtasks)).sum()
}

/// Sum of story points in a task forest, counting subtasks recursively.
pub fn total_story_points(tasks: &[Task]) -> u32 {
    tasks
        .iter()
        .map(|t| t.story_points + total_story_points(&t.subtasks))
        .sum()
}

/// Depth of a task forest; an empty forest has depth 0.
pub fn tree_depth(tasks: &[Task]) -> usize {
    tasks
        .iter()
        .map(|t| 1 + tree_depth(&t.subtasks))
        .max()
        .unwrap_or(0)
}

/// Depth-first, pre-order visit of every node.
pub fn visit_tasks<'a>(tasks: &'a [Task], visit: &mut impl FnMut(&'a Task)) {
    for task in tasks {
        visit(task);
        visit_tasks(&task.subtasks, visit);
    }
}

/// A task tree that violates the schema or the size bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskTreeError {
    #[error("task {path}: summary must not be empty")]
    EmptySummary { path: String },

    #[error("task {path}: story points {points} outside 1-13")]
    StoryPointsOutOfRange { path: String, points: u32 },

    #[error("task tree depth exceeds {} levels", MAX_TASK_DEPTH)]
    TooDeep,

    #[error("task tree has {count} tasks, more than the {} allowed", MAX_TASK_NODES)]
    TooManyTasks { count: usize },
}

/// Validate a task forest against the field rules and size bounds.
///
/// Paths in errors are 1-based positions joined by dots, e.g. `2.1` for the
/// first subtask of the second top-level task.
pub fn validate_task_tree(tasks: &[Task]) -> Result<(), TaskTreeError> {
    if tree_depth(tasks) > MAX_TASK_DEPTH {
        return Err(TaskTreeError::TooDeep);
    }

    let count = count_tasks(tasks);
    if count > MAX_TASK_NODES {
        return Err(TaskTreeError::TooManyTasks { count });
    }

    validate_level(tasks, "")
}

fn validate_level(tasks: &[Task], prefix: &str) -> Result<(), TaskTreeError> {
    for (i, task) in tasks.iter().enumerate() {
        let path = if prefix.is_empty() {
            (i + 1).to_string()
        } else {
            format!("{prefix}.{}", i + 1)
        };

        if task.summary.trim().is_empty() {
            return Err(TaskTreeError::EmptySummary { path });
        }

        if !(MIN_STORY_POINTS..=MAX_STORY_POINTS).contains(&task.story_points) {
            return Err(TaskTreeError::StoryPointsOutOfRange {
                path,
                points: task.story_points,
            });
        }

        validate_level(&task.subtasks, &path)?;
    }
    Ok(())
}
