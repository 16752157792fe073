//! Initiative CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{Initiative, InitiativeStatus, Revision, Task};

#[derive(Args, Debug)]
pub struct InitiativeArgs {
    #[command(subcommand)]
    pub command: InitiativeCommands,
}

#[derive(Subcommand, Debug)]
pub enum InitiativeCommands {
    /// Create an initiative and generate its suggested breakdown
    Create {
        /// Initiative title
        #[arg(short, long)]
        title: String,
        /// Initiative description
        #[arg(short, long)]
        description: String,
    },
    /// Record an edited breakdown for an initiative under review
    Revise {
        /// Initiative ID
        id: Uuid,
        /// JSON file holding the task list
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Approve an initiative with its final breakdown
    Finalize {
        /// Initiative ID
        id: Uuid,
        /// JSON file holding the task list
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Record that an approved breakdown was published to Jira
    Upload {
        /// Initiative ID
        id: Uuid,
        /// Jira project key
        #[arg(short, long)]
        project_key: String,
        /// Jira epic link
        #[arg(short, long)]
        epic_link: Option<String>,
    },
    /// List initiatives
    List {
        /// Filter by status (draft, reviewing, approved, uploaded)
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Show an initiative with its revision history
    Show {
        /// Initiative ID
        id: Uuid,
    },
}

#[derive(Debug, Serialize)]
pub struct InitiativeOutput {
    pub id: String,
    pub title: String,
    pub status: String,
    pub revisions: usize,
    pub total_tasks: usize,
    pub total_story_points: u32,
    pub created_at: String,
}

impl From<&Initiative> for InitiativeOutput {
    fn from(initiative: &Initiative) -> Self {
        let latest = initiative.latest_revision();
        Self {
            id: initiative.id.to_string(),
            title: initiative.title.clone(),
            status: initiative.status.as_str().to_string(),
            revisions: initiative.revisions.len(),
            total_tasks: latest.map_or(0, |r| r.metadata.total_tasks),
            total_story_points: latest.map_or(0, |r| r.metadata.total_story_points),
            created_at: initiative.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InitiativeListOutput {
    pub initiatives: Vec<InitiativeOutput>,
    pub total: usize,
}

impl CommandOutput for InitiativeListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "title", "status", "revisions", "tasks", "points", "created"]);
        for initiative in &self.initiatives {
            table.add_row(vec![
                initiative.id.clone(),
                truncate(&initiative.title, 40),
                initiative.status.clone(),
                initiative.revisions.to_string(),
                initiative.total_tasks.to_string(),
                initiative.total_story_points.to_string(),
                initiative.created_at.clone(),
            ]);
        }
        render_list("initiative", &table, self.total)
    }
}

/// Full initiative, printed as a revision table plus the latest task tree.
#[derive(Debug, Serialize)]
pub struct InitiativeDetailOutput {
    #[serde(flatten)]
    pub initiative: Initiative,
}

impl CommandOutput for InitiativeDetailOutput {
    fn to_human(&self) -> String {
        let initiative = &self.initiative;
        let mut lines = vec![
            format!("Initiative: {}", initiative.title),
            format!("ID: {}", initiative.id),
            format!("Status: {}", initiative.status),
            format!("Description: {}", initiative.description),
            format!("Created: {}", initiative.created_at.to_rfc3339()),
        ];
        if let Some(key) = &initiative.jira_project_key {
            lines.push(format!("Jira project: {key}"));
        }
        if let Some(epic) = &initiative.jira_epic_link {
            lines.push(format!("Jira epic: {epic}"));
        }

        if !initiative.revisions.is_empty() {
            let mut table = list_table(&["#", "kind", "timestamp", "tasks", "points", "edit distance", "accuracy"]);
            for (i, revision) in initiative.revisions.iter().enumerate() {
                table.add_row(revision_row(i + 1, revision));
            }
            lines.push(String::new());
            lines.push(format!("Revisions:\n{table}"));
        }

        if let Some(latest) = initiative.latest_revision() {
            lines.push(String::new());
            lines.push(format!("Tasks ({}):", latest.kind));
            render_tasks(&latest.tasks, 1, &mut lines);
        }

        lines.join("\n")
    }
}

fn revision_row(seq: usize, revision: &Revision) -> Vec<String> {
    vec![
        seq.to_string(),
        revision.kind.as_str().to_string(),
        revision.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        revision.metadata.total_tasks.to_string(),
        revision.metadata.total_story_points.to_string(),
        revision
            .metadata
            .edit_distance
            .map_or_else(|| "-".to_string(), |d| d.to_string()),
        revision
            .metadata
            .accuracy
            .map_or_else(|| "-".to_string(), |a| format!("{:.1}%", a * 100.0)),
    ]
}

fn render_tasks(tasks: &[Task], depth: usize, lines: &mut Vec<String>) {
    for task in tasks {
        lines.push(format!(
            "{}- [{}] {} ({} pts, {})",
            "  ".repeat(depth),
            task.kind.as_str(),
            task.summary,
            task.story_points,
            task.priority.as_str()
        ));
        render_tasks(&task.subtasks, depth + 1, lines);
    }
}

#[derive(Debug, Serialize)]
pub struct InitiativeActionOutput {
    pub success: bool,
    pub message: String,
    pub initiative: InitiativeOutput,
}

impl CommandOutput for InitiativeActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

/// Task files hold a bare list or `{"tasks": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskFile {
    List(Vec<Task>),
    Wrapped { tasks: Vec<Task> },
}

async fn read_tasks(path: &Path) -> Result<Vec<Task>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: TaskFile = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid task list", path.display()))?;
    Ok(match file {
        TaskFile::List(tasks) | TaskFile::Wrapped { tasks } => tasks,
    })
}

fn action(message: String, initiative: &Initiative) -> InitiativeActionOutput {
    InitiativeActionOutput {
        success: true,
        message,
        initiative: InitiativeOutput::from(initiative),
    }
}

pub async fn execute(args: InitiativeArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = &ctx.initiatives;

    match args.command {
        InitiativeCommands::Create { title, description } => {
            let initiative = service
                .create_initiative(title, description)
                .await
                .context("Failed to create initiative")?;
            let summary = InitiativeOutput::from(&initiative);
            let message = format!(
                "Initiative created: {}\nSuggested {} task(s), {} story point(s). Status: {}",
                summary.id, summary.total_tasks, summary.total_story_points, summary.status
            );
            output(&action(message, &initiative), json_mode);
        }
        InitiativeCommands::Revise { id, file } => {
            let tasks = read_tasks(&file).await?;
            let initiative = service
                .revise_tasks(id, tasks)
                .await
                .context("Failed to revise initiative")?;
            let distance = initiative
                .latest_revision()
                .and_then(|r| r.metadata.edit_distance)
                .unwrap_or_default();
            let message = format!("Revision recorded for {id} (edit distance {distance})");
            output(&action(message, &initiative), json_mode);
        }
        InitiativeCommands::Finalize { id, file } => {
            let tasks = read_tasks(&file).await?;
            let initiative = service
                .finalize(id, tasks)
                .await
                .context("Failed to finalize initiative")?;
            let accuracy = initiative
                .latest_revision()
                .and_then(|r| r.metadata.accuracy)
                .unwrap_or_default();
            let message = format!(
                "Initiative {id} approved. Suggestion accuracy: {:.1}%",
                accuracy * 100.0
            );
            output(&action(message, &initiative), json_mode);
        }
        InitiativeCommands::Upload { id, project_key, epic_link } => {
            let initiative = service
                .mark_uploaded(id, project_key, epic_link)
                .await
                .context("Failed to mark initiative as uploaded")?;
            let message = format!(
                "Initiative {id} marked as uploaded to {}",
                initiative.jira_project_key.as_deref().unwrap_or_default()
            );
            output(&action(message, &initiative), json_mode);
        }
        InitiativeCommands::List { status } => {
            let initiatives = match status {
                Some(s) => {
                    let status = InitiativeStatus::from_str(&s)
                        .ok_or_else(|| anyhow::anyhow!("Invalid status: {s}"))?;
                    service.list_by_status(status).await?
                }
                None => service.list_all().await?,
            };
            let list = InitiativeListOutput {
                total: initiatives.len(),
                initiatives: initiatives.iter().map(InitiativeOutput::from).collect(),
            };
            output(&list, json_mode);
        }
        InitiativeCommands::Show { id } => {
            let initiative = service.get_initiative(id).await?;
            output(&InitiativeDetailOutput { initiative }, json_mode);
        }
    }

    Ok(())
}
