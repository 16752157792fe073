//! SQLite repository behaviour against an on-disk database.

use chrono::Utc;

use smartspec::adapters::sqlite::{initialize_database, SqliteInitiativeRepository};
use smartspec::domain::errors::DomainError;
use smartspec::domain::models::{
    DatabaseConfig, Initiative, InitiativeStatus, Revision, RevisionKind, RevisionScores, Task,
    TaskKind, TaskPriority,
};
use smartspec::domain::ports::InitiativeRepository;

fn config(dir: &tempfile::TempDir) -> DatabaseConfig {
    DatabaseConfig {
        path: dir.path().join("nested/smartspec.db").display().to_string(),
        max_connections: 2,
    }
}

fn suggested(title: &str) -> Initiative {
    let mut initiative = Initiative::new(title, "description");
    let tasks = vec![Task::new(TaskKind::Story, "Plan", TaskPriority::High, 3)
        .with_subtask(Task::new(TaskKind::Bug, "Fix login", TaskPriority::Highest, 1))];
    initiative
        .push_revision(Revision::new(
            RevisionKind::Suggestion,
            tasks,
            RevisionScores::default(),
            Utc::now(),
        ))
        .unwrap();
    initiative.transition_to(InitiativeStatus::Reviewing).unwrap();
    initiative
}

#[tokio::test]
async fn test_data_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let mut initiative = suggested("Persistent");

    {
        let pool = initialize_database(&config(&dir)).await.unwrap();
        let repo = SqliteInitiativeRepository::new(pool.clone());
        repo.save(&initiative).await.unwrap();
        initiative.version += 1;
        pool.close().await;
    }

    // Reopening applies no migrations twice and sees the stored rows
    let pool = initialize_database(&config(&dir)).await.unwrap();
    let repo = SqliteInitiativeRepository::new(pool);
    let loaded = repo.find_by_id(initiative.id).await.unwrap().unwrap();

    assert_eq!(loaded, initiative);
    assert_eq!(loaded.revisions[0].tasks[0].subtasks[0].summary, "Fix login");
}

#[tokio::test]
async fn test_revisions_are_appended_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteInitiativeRepository::new(initialize_database(&config(&dir)).await.unwrap());

    let mut initiative = suggested("Ordered");
    repo.save(&initiative).await.unwrap();
    initiative.version += 1;

    for points in [2, 5] {
        initiative
            .push_revision(Revision::new(
                RevisionKind::UserEdit,
                vec![Task::new(TaskKind::Task, "Edit", TaskPriority::Low, points)],
                RevisionScores {
                    accuracy: None,
                    edit_distance: Some(2),
                },
                Utc::now(),
            ))
            .unwrap();
        repo.save(&initiative).await.unwrap();
        initiative.version += 1;
    }

    let revisions = repo.find_revisions(initiative.id).await.unwrap();
    let kinds: Vec<_> = revisions.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![RevisionKind::Suggestion, RevisionKind::UserEdit, RevisionKind::UserEdit]
    );
    assert_eq!(revisions[2].metadata.total_story_points, 5);
    assert_eq!(revisions[1].metadata.edit_distance, Some(2));
    assert!(revisions.iter().all(Revision::totals_consistent));
}

#[tokio::test]
async fn test_stale_writer_loses() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteInitiativeRepository::new(initialize_database(&config(&dir)).await.unwrap());

    let initiative = suggested("Contended");
    repo.save(&initiative).await.unwrap();

    let mut first = repo.find_by_id(initiative.id).await.unwrap().unwrap();
    let mut second = first.clone();

    first.title = "First writer".to_string();
    repo.save(&first).await.unwrap();

    second.title = "Second writer".to_string();
    let err = repo.save(&second).await.unwrap_err();
    assert!(matches!(err, DomainError::ConcurrencyConflict { .. }));

    let stored = repo.find_by_id(initiative.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "First writer");
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_missing_initiative_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteInitiativeRepository::new(initialize_database(&config(&dir)).await.unwrap());

    assert!(repo.find_by_id(uuid::Uuid::new_v4()).await.unwrap().is_none());
    assert!(repo.find_revisions(uuid::Uuid::new_v4()).await.unwrap().is_empty());
    assert!(repo.find_all().await.unwrap().is_empty());
}
