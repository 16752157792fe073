//! Analytics over stored initiatives.
//!
//! The `compute_*` functions are pure and work on any slice of
//! initiatives; [`AnalyticsService`] feeds them from the repository.
//! Empty denominators yield `0.0`.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::analytics::empty_status_counts;
use crate::domain::models::{
    visit_tasks, Initiative, PerformanceMetrics, ProcessMetrics, ProcessTrends, TimeWindow,
};
use crate::domain::ports::InitiativeRepository;

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Lifecycle metrics, optionally restricted to initiatives created in `window`.
pub fn compute_process_metrics(
    initiatives: &[Initiative],
    window: Option<TimeWindow>,
) -> ProcessMetrics {
    let mut metrics = ProcessMetrics::default();
    let mut total_revisions = 0usize;
    let mut approval_secs = 0.0;
    let mut approved = 0usize;

    for initiative in initiatives
        .iter()
        .filter(|i| window.map_or(true, |w| w.contains(i.created_at)))
    {
        metrics.total_processes += 1;
        *metrics.status_distribution.entry(initiative.status).or_insert(0) += 1;

        total_revisions += initiative.revisions.len();
        for revision in &initiative.revisions {
            *metrics.revision_type_distribution.entry(revision.kind).or_insert(0) += 1;
        }

        if let Some(elapsed) = initiative.time_to_approval() {
            approval_secs += elapsed.num_milliseconds() as f64 / 1000.0;
            approved += 1;
        }
    }

    metrics.average_revisions_per_process =
        ratio(total_revisions as f64, metrics.total_processes as f64);
    metrics.average_time_to_approval_secs = ratio(approval_secs, approved as f64);
    metrics
}

/// Per-day counts for the `days` calendar days ending on `now`'s date.
///
/// A window of zero days is treated as one (today only).
pub fn compute_process_trends(
    initiatives: &[Initiative],
    days: u32,
    now: DateTime<Utc>,
) -> ProcessTrends {
    let end = now.date_naive();
    let start = end - Duration::days(i64::from(days.max(1)) - 1);

    let mut trends = ProcessTrends::default();
    let mut day = start;
    while day <= end {
        trends.daily_processes.insert(day, 0);
        trends.status_changes.insert(day, empty_status_counts());
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    for initiative in initiatives {
        let created: NaiveDate = initiative.created_at.date_naive();
        if created < start || created > end {
            continue;
        }

        *trends.daily_processes.entry(created).or_insert(0) += 1;
        *trends
            .status_changes
            .entry(created)
            .or_insert_with(empty_status_counts)
            .entry(initiative.status)
            .or_insert(0) += 1;
    }

    trends
}

/// Shape of the breakdowns, using each initiative's effective revision.
pub fn compute_performance_metrics(initiatives: &[Initiative]) -> PerformanceMetrics {
    let mut metrics = PerformanceMetrics::default();
    let mut total_tasks = 0u64;
    let mut total_points = 0u64;

    for initiative in initiatives {
        let Some(revision) = initiative.effective_revision() else {
            continue;
        };

        visit_tasks(&revision.tasks, &mut |task| {
            total_tasks += 1;
            total_points += u64::from(task.story_points);
            *metrics.task_distribution_by_type.entry(task.kind).or_insert(0) += 1;
            *metrics.priority_distribution.entry(task.priority).or_insert(0) += 1;
        });
    }

    metrics.average_tasks_per_process = ratio(total_tasks as f64, initiatives.len() as f64);
    metrics.average_story_points = ratio(total_points as f64, total_tasks as f64);
    metrics
}

/// Read-only analytics queries backed by the initiative repository.
pub struct AnalyticsService<R: InitiativeRepository> {
    repository: Arc<R>,
}

impl<R: InitiativeRepository> AnalyticsService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn process_metrics(&self, window: Option<TimeWindow>) -> DomainResult<ProcessMetrics> {
        let initiatives = self.repository.find_all().await?;
        Ok(compute_process_metrics(&initiatives, window))
    }

    pub async fn process_trends(&self, days: u32) -> DomainResult<ProcessTrends> {
        self.process_trends_at(days, Utc::now()).await
    }

    pub async fn process_trends_at(&self, days: u32, now: DateTime<Utc>) -> DomainResult<ProcessTrends> {
        let initiatives = self.repository.find_all().await?;
        Ok(compute_process_trends(&initiatives, days, now))
    }

    pub async fn performance_metrics(&self) -> DomainResult<PerformanceMetrics> {
        let initiatives = self.repository.find_all().await?;
        Ok(compute_performance_metrics(&initiatives))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        InitiativeStatus, Revision, RevisionKind, RevisionScores, Task, TaskKind, TaskPriority,
    };
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn initiative_with(created: DateTime<Utc>, kinds: &[(RevisionKind, Vec<Task>, i64)]) -> Initiative {
        let mut initiative = Initiative::new("T", "D");
        initiative.created_at = created;
        for (kind, tasks, offset_secs) in kinds {
            let revision = Revision::new(
                *kind,
                tasks.clone(),
                RevisionScores::default(),
                created + Duration::seconds(*offset_secs),
            );
            initiative.push_revision(revision).unwrap();
        }
        initiative
    }

    fn t(kind: TaskKind, priority: TaskPriority, points: u32) -> Task {
        Task::new(kind, "x", priority, points)
    }

    #[test]
    fn test_empty_input_yields_zeros() {
        let metrics = compute_process_metrics(&[], None);
        assert_eq!(metrics.total_processes, 0);
        assert_eq!(metrics.average_revisions_per_process, 0.0);
        assert_eq!(metrics.average_time_to_approval_secs, 0.0);
        assert_eq!(metrics.status_distribution.len(), 4);
        assert!(metrics.status_distribution.values().all(|c| *c == 0));

        let perf = compute_performance_metrics(&[]);
        assert_eq!(perf.average_tasks_per_process, 0.0);
        assert_eq!(perf.average_story_points, 0.0);
    }

    #[test]
    fn test_process_metrics() {
        let tasks = vec![t(TaskKind::Story, TaskPriority::High, 5)];
        let mut approved = initiative_with(
            at(1, 0),
            &[
                (RevisionKind::Suggestion, tasks.clone(), 10),
                (RevisionKind::UserEdit, tasks.clone(), 20),
                (RevisionKind::Final, tasks.clone(), 100),
            ],
        );
        approved.status = InitiativeStatus::Approved;
        let mut reviewing =
            initiative_with(at(2, 0), &[(RevisionKind::Suggestion, tasks.clone(), 5)]);
        reviewing.status = InitiativeStatus::Reviewing;

        let metrics = compute_process_metrics(&[approved.clone(), reviewing.clone()], None);
        assert_eq!(metrics.total_processes, 2);
        assert_eq!(metrics.status_distribution[&InitiativeStatus::Approved], 1);
        assert_eq!(metrics.status_distribution[&InitiativeStatus::Reviewing], 1);
        assert_eq!(metrics.status_distribution[&InitiativeStatus::Draft], 0);
        assert!((metrics.average_revisions_per_process - 2.0).abs() < 1e-9);
        assert!((metrics.average_time_to_approval_secs - 100.0).abs() < 1e-9);
        assert_eq!(metrics.revision_type_distribution[&RevisionKind::Suggestion], 2);
        assert_eq!(metrics.revision_type_distribution[&RevisionKind::Final], 1);

        let window = TimeWindow::new(at(2, 0), at(3, 0));
        let filtered = compute_process_metrics(&[approved, reviewing], Some(window));
        assert_eq!(filtered.total_processes, 1);
        assert_eq!(filtered.average_time_to_approval_secs, 0.0);
    }

    #[test]
    fn test_trends_zero_fill_window() {
        let tasks = vec![t(TaskKind::Task, TaskPriority::Low, 1)];
        let mut a = initiative_with(at(9, 8), &[(RevisionKind::Suggestion, tasks.clone(), 1)]);
        a.status = InitiativeStatus::Reviewing;
        let b = initiative_with(at(9, 20), &[]);
        let old = initiative_with(at(1, 0), &[]);

        let trends = compute_process_trends(&[a, b, old], 3, at(10, 12));
        assert_eq!(trends.daily_processes.len(), 3);
        let day9 = at(9, 0).date_naive();
        assert_eq!(trends.daily_processes[&day9], 2);
        assert_eq!(trends.daily_processes[&at(10, 0).date_naive()], 0);
        assert_eq!(trends.status_changes[&day9][&InitiativeStatus::Reviewing], 1);
        assert_eq!(trends.status_changes[&day9][&InitiativeStatus::Draft], 1);
        assert!(!trends.daily_processes.contains_key(&at(1, 0).date_naive()));
    }

    #[test]
    fn test_trends_window_has_exactly_requested_days() {
        let today = initiative_with(at(10, 1), &[]);
        let edge = initiative_with(at(4, 23), &[]);
        let outside = initiative_with(at(3, 23), &[]);

        let week = compute_process_trends(&[today, edge, outside], 7, at(10, 12));
        assert_eq!(week.daily_processes.len(), 7);
        assert_eq!(week.daily_processes.keys().next(), Some(&at(4, 0).date_naive()));
        assert_eq!(week.daily_processes.values().sum::<u64>(), 2);

        let zero = compute_process_trends(&[], 0, at(10, 12));
        assert_eq!(zero.daily_processes.len(), 1);
        assert!(zero.daily_processes.contains_key(&at(10, 0).date_naive()));
    }

    #[test]
    fn test_performance_prefers_final_revision() {
        let suggestion = vec![
            t(TaskKind::Story, TaskPriority::High, 5),
            t(TaskKind::Bug, TaskPriority::Low, 1),
        ];
        let final_tasks = vec![t(TaskKind::Story, TaskPriority::High, 8)
            .with_subtask(t(TaskKind::Task, TaskPriority::Medium, 2))];
        let finalized = initiative_with(
            at(1, 0),
            &[
                (RevisionKind::Suggestion, suggestion.clone(), 1),
                (RevisionKind::Final, final_tasks, 2),
                (RevisionKind::UserEdit, suggestion.clone(), 3),
            ],
        );
        let draft = initiative_with(at(1, 0), &[]);

        let perf = compute_performance_metrics(&[finalized, draft]);
        assert!((perf.average_tasks_per_process - 1.0).abs() < 1e-9);
        assert!((perf.average_story_points - 5.0).abs() < 1e-9);
        assert_eq!(perf.task_distribution_by_type[&TaskKind::Story], 1);
        assert_eq!(perf.task_distribution_by_type[&TaskKind::Task], 1);
        assert_eq!(perf.task_distribution_by_type[&TaskKind::Bug], 0);
        assert_eq!(perf.priority_distribution[&TaskPriority::Medium], 1);
    }
}
