//! Read-side analytics over the initiative history.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::initiative::InitiativeStatus;
use super::revision::RevisionKind;
use super::task::{TaskKind, TaskPriority};

/// Inclusive creation-time window used to filter initiatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Zero-filled count per status.
pub fn empty_status_counts() -> BTreeMap<InitiativeStatus, u64> {
    InitiativeStatus::ALL.iter().map(|s| (*s, 0)).collect()
}

/// Lifecycle metrics over a set of initiatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMetrics {
    pub total_processes: u64,
    pub status_distribution: BTreeMap<InitiativeStatus, u64>,
    pub average_revisions_per_process: f64,
    /// Seconds from creation to first final revision, over approved initiatives.
    pub average_time_to_approval_secs: f64,
    pub revision_type_distribution: BTreeMap<RevisionKind, u64>,
}

impl Default for ProcessMetrics {
    fn default() -> Self {
        Self {
            total_processes: 0,
            status_distribution: empty_status_counts(),
            average_revisions_per_process: 0.0,
            average_time_to_approval_secs: 0.0,
            revision_type_distribution: RevisionKind::ALL.iter().map(|k| (*k, 0)).collect(),
        }
    }
}

/// Per-day counts over a trailing window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTrends {
    /// Initiatives created per UTC day.
    pub daily_processes: BTreeMap<NaiveDate, u64>,
    /// Current status of the initiatives created per UTC day.
    pub status_changes: BTreeMap<NaiveDate, BTreeMap<InitiativeStatus, u64>>,
}

/// Breakdown-shape metrics over each initiative's effective revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub average_tasks_per_process: f64,
    pub task_distribution_by_type: BTreeMap<TaskKind, u64>,
    pub average_story_points: f64,
    pub priority_distribution: BTreeMap<TaskPriority, u64>,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            average_tasks_per_process: 0.0,
            task_distribution_by_type: TaskKind::ALL.iter().map(|k| (*k, 0)).collect(),
            average_story_points: 0.0,
            priority_distribution: TaskPriority::ALL.iter().map(|p| (*p, 0)).collect(),
        }
    }
}
