//! Revision ledger: appends scored snapshots to an initiative.
//!
//! Tasks carry no identity, so two snapshots are compared positionally
//! level by level. A matched pair whose own fields differ costs one unit;
//! a task present on only one side costs one unit per node in its subtree.
//! That gives `edit_distance(x, x) == 0` and makes every added, removed or
//! modified node add distance.

use chrono::Utc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    count_tasks, Initiative, Revision, RevisionKind, RevisionScores, Task,
};

/// Structural distance between two ordered task forests.
pub fn edit_distance(a: &[Task], b: &[Task]) -> usize {
    let matched: usize = a
        .iter()
        .zip(b)
        .map(|(x, y)| usize::from(!x.same_fields(y)) + edit_distance(&x.subtasks, &y.subtasks))
        .sum();

    let common = a.len().min(b.len());
    let unmatched = count_tasks(&a[common..]) + count_tasks(&b[common..]);

    matched + unmatched
}

/// Closeness of a final breakdown to the suggestion, in `[0, 1]`.
///
/// `1 - distance / (nodes(suggested) + nodes(final))`; two empty forests are
/// identical and score `1.0`.
pub fn accuracy(suggested: &[Task], final_tasks: &[Task]) -> f64 {
    let max_distance = count_tasks(suggested) + count_tasks(final_tasks);
    if max_distance == 0 {
        return 1.0;
    }

    let distance = edit_distance(suggested, final_tasks);
    (1.0 - distance as f64 / max_distance as f64).clamp(0.0, 1.0)
}

/// Scores a new revision of `kind` would carry on `initiative`.
pub fn score_revision(
    initiative: &Initiative,
    kind: RevisionKind,
    tasks: &[Task],
) -> DomainResult<RevisionScores> {
    match kind {
        RevisionKind::Suggestion => Ok(RevisionScores::default()),
        RevisionKind::UserEdit => {
            let previous = initiative.latest_revision().ok_or_else(|| missing_suggestion(initiative))?;
            Ok(RevisionScores {
                accuracy: None,
                edit_distance: Some(edit_distance(&previous.tasks, tasks)),
            })
        }
        RevisionKind::Final => {
            let suggestion = initiative.suggestion().ok_or_else(|| missing_suggestion(initiative))?;
            let previous = initiative.latest_revision().ok_or_else(|| missing_suggestion(initiative))?;
            Ok(RevisionScores {
                accuracy: Some(accuracy(&suggestion.tasks, tasks)),
                edit_distance: Some(edit_distance(&previous.tasks, tasks)),
            })
        }
    }
}

/// Score `tasks` against the ledger and append them as a new revision.
pub fn append_revision(
    initiative: &mut Initiative,
    kind: RevisionKind,
    tasks: Vec<Task>,
) -> DomainResult<()> {
    if kind == RevisionKind::Suggestion && !initiative.revisions.is_empty() {
        return Err(DomainError::InvalidState {
            status: initiative.status,
            operation: "attach a suggestion to",
            reason: "a suggestion already exists".to_string(),
        });
    }

    let scores = score_revision(initiative, kind, &tasks)?;
    let revision = Revision::new(kind, tasks, scores, Utc::now());

    tracing::debug!(
        initiative_id = %initiative.id,
        kind = %kind,
        total_tasks = revision.metadata.total_tasks,
        edit_distance = ?revision.metadata.edit_distance,
        accuracy = ?revision.metadata.accuracy,
        "appending revision"
    );

    initiative.push_revision(revision)
}

fn missing_suggestion(initiative: &Initiative) -> DomainError {
    DomainError::InvalidState {
        status: initiative.status,
        operation: "revise",
        reason: "no suggestion revision exists".to_string(),
    }
}
