//! SQLite implementation of the InitiativeRepository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Initiative, InitiativeStatus, Revision, RevisionKind, RevisionMetadata, Task};
use crate::domain::ports::InitiativeRepository;

const INITIATIVE_COLUMNS: &str = "id, title, description, status, jira_project_key, jira_epic_link, version, created_at, updated_at";
const REVISION_COLUMNS: &str = "id, initiative_id, kind, timestamp, tasks, metadata";

#[derive(Clone)]
pub struct SqliteInitiativeRepository {
    pool: SqlitePool,
}

impl SqliteInitiativeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert_row(&self, tx: &mut Transaction<'_, Sqlite>, initiative: &Initiative) -> DomainResult<()> {
        let result = sqlx::query(
            r#"INSERT INTO initiatives (id, title, description, status, jira_project_key, jira_epic_link, version, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
               ON CONFLICT(id) DO NOTHING"#,
        )
        .bind(initiative.id.to_string())
        .bind(&initiative.title)
        .bind(&initiative.description)
        .bind(initiative.status.as_str())
        .bind(&initiative.jira_project_key)
        .bind(&initiative.jira_epic_link)
        .bind(format_datetime(initiative.created_at))
        .bind(format_datetime(initiative.updated_at))
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::initiative_conflict(initiative.id));
        }
        Ok(())
    }

    async fn update_row(&self, tx: &mut Transaction<'_, Sqlite>, initiative: &Initiative) -> DomainResult<()> {
        let expected = to_db_version(initiative.version)?;

        let result = sqlx::query(
            r#"UPDATE initiatives SET title = ?, description = ?, status = ?,
               jira_project_key = ?, jira_epic_link = ?, updated_at = ?, version = version + 1
               WHERE id = ? AND version = ?"#,
        )
        .bind(&initiative.title)
        .bind(&initiative.description)
        .bind(initiative.status.as_str())
        .bind(&initiative.jira_project_key)
        .bind(&initiative.jira_epic_link)
        .bind(format_datetime(initiative.updated_at))
        .bind(initiative.id.to_string())
        .bind(expected)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::initiative_conflict(initiative.id));
        }
        Ok(())
    }

    async fn insert_revisions(&self, tx: &mut Transaction<'_, Sqlite>, initiative: &Initiative) -> DomainResult<()> {
        for (seq, revision) in initiative.revisions.iter().enumerate() {
            let tasks_json = serde_json::to_string(&revision.tasks)?;
            let metadata_json = serde_json::to_string(&revision.metadata)?;
            let seq = i64::try_from(seq)
                .map_err(|e| DomainError::SerializationError(e.to_string()))?;

            // Stored revisions are immutable; only new ones land.
            sqlx::query(
                r#"INSERT INTO initiative_revisions (id, initiative_id, seq, kind, timestamp, tasks, metadata)
                   VALUES (?, ?, ?, ?, ?, ?, ?)
                   ON CONFLICT DO NOTHING"#,
            )
            .bind(revision.id.to_string())
            .bind(initiative.id.to_string())
            .bind(seq)
            .bind(revision.kind.as_str())
            .bind(format_datetime(revision.timestamp))
            .bind(&tasks_json)
            .bind(&metadata_json)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn fetch_revisions(&self, status: Option<InitiativeStatus>) -> DomainResult<HashMap<String, Vec<Revision>>> {
        let rows: Vec<RevisionRow> = match status {
            Some(status) => {
                sqlx::query_as(&format!(
                    "SELECT {REVISION_COLUMNS} FROM initiative_revisions
                     WHERE initiative_id IN (SELECT id FROM initiatives WHERE status = ?)
                     ORDER BY initiative_id, seq"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {REVISION_COLUMNS} FROM initiative_revisions ORDER BY initiative_id, seq"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut grouped: HashMap<String, Vec<Revision>> = HashMap::new();
        for row in rows {
            let key = row.initiative_id.clone();
            grouped.entry(key).or_default().push(row.try_into()?);
        }
        Ok(grouped)
    }

    fn assemble(row: InitiativeRow, revisions: Vec<Revision>) -> DomainResult<Initiative> {
        let mut initiative: Initiative = row.try_into()?;
        initiative.revisions = revisions;
        initiative.validate().map_err(|reason| {
            DomainError::SerializationError(format!("stored initiative {} is inconsistent: {reason}", initiative.id))
        })?;
        Ok(initiative)
    }
}

#[async_trait]
impl InitiativeRepository for SqliteInitiativeRepository {
    async fn save(&self, initiative: &Initiative) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        if initiative.version == 0 {
            self.insert_row(&mut tx, initiative).await?;
        } else {
            self.update_row(&mut tx, initiative).await?;
        }
        self.insert_revisions(&mut tx, initiative).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Initiative>> {
        let row: Option<InitiativeRow> = sqlx::query_as(&format!(
            "SELECT {INITIATIVE_COLUMNS} FROM initiatives WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let revisions = self.find_revisions(id).await?;
                Self::assemble(row, revisions).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> DomainResult<Vec<Initiative>> {
        let rows: Vec<InitiativeRow> = sqlx::query_as(&format!(
            "SELECT {INITIATIVE_COLUMNS} FROM initiatives ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut revisions = self.fetch_revisions(None).await?;
        rows.into_iter()
            .map(|row| {
                let revs = revisions.remove(&row.id).unwrap_or_default();
                Self::assemble(row, revs)
            })
            .collect()
    }

    async fn find_by_status(&self, status: InitiativeStatus) -> DomainResult<Vec<Initiative>> {
        let rows: Vec<InitiativeRow> = sqlx::query_as(&format!(
            "SELECT {INITIATIVE_COLUMNS} FROM initiatives WHERE status = ? ORDER BY created_at DESC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut revisions = self.fetch_revisions(Some(status)).await?;
        rows.into_iter()
            .map(|row| {
                let revs = revisions.remove(&row.id).unwrap_or_default();
                Self::assemble(row, revs)
            })
            .collect()
    }

    async fn find_revisions(&self, initiative_id: Uuid) -> DomainResult<Vec<Revision>> {
        let rows: Vec<RevisionRow> = sqlx::query_as(&format!(
            "SELECT {REVISION_COLUMNS} FROM initiative_revisions WHERE initiative_id = ? ORDER BY seq"
        ))
        .bind(initiative_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

fn format_datetime(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn to_db_version(version: u64) -> DomainResult<i64> {
    i64::try_from(version).map_err(|e| DomainError::SerializationError(e.to_string()))
}

#[derive(sqlx::FromRow)]
struct InitiativeRow {
    id: String,
    title: String,
    description: String,
    status: String,
    jira_project_key: Option<String>,
    jira_epic_link: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<InitiativeRow> for Initiative {
    type Error = DomainError;

    fn try_from(row: InitiativeRow) -> Result<Self, Self::Error> {
        let status = InitiativeStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid status: {}", row.status)))?;
        let version = u64::try_from(row.version)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        Ok(Initiative {
            id: parse_uuid(&row.id)?,
            title: row.title,
            description: row.description,
            status,
            revisions: Vec::new(),
            jira_project_key: row.jira_project_key,
            jira_epic_link: row.jira_epic_link,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            version,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RevisionRow {
    id: String,
    initiative_id: String,
    kind: String,
    timestamp: String,
    tasks: String,
    metadata: String,
}

impl TryFrom<RevisionRow> for Revision {
    type Error = DomainError;

    fn try_from(row: RevisionRow) -> Result<Self, Self::Error> {
        let kind = RevisionKind::from_str(&row.kind)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid revision kind: {}", row.kind)))?;
        let tasks: Vec<Task> = serde_json::from_str(&row.tasks)?;
        let metadata: RevisionMetadata = serde_json::from_str(&row.metadata)?;

        Ok(Revision {
            id: parse_uuid(&row.id)?,
            timestamp: parse_datetime(&row.timestamp)?,
            kind,
            tasks,
            metadata,
        })
    }
}
