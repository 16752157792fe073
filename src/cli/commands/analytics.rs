//! Analytics CLI commands.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::{PerformanceMetrics, ProcessMetrics, ProcessTrends, TimeWindow};

#[derive(Args, Debug)]
pub struct AnalyticsArgs {
    #[command(subcommand)]
    pub command: AnalyticsCommands,
}

#[derive(Subcommand, Debug)]
pub enum AnalyticsCommands {
    /// Lifecycle metrics, optionally limited to a creation window
    Metrics {
        /// Window start (RFC 3339)
        #[arg(long, requires = "to")]
        from: Option<DateTime<Utc>>,
        /// Window end (RFC 3339)
        #[arg(long, requires = "from")]
        to: Option<DateTime<Utc>>,
    },
    /// Daily creation counts over the trailing window
    Trends {
        /// Number of days to look back
        #[arg(short, long, default_value = "30")]
        days: u32,
    },
    /// Breakdown shape of the effective revisions
    Performance,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct MetricsOutput(pub ProcessMetrics);

impl CommandOutput for MetricsOutput {
    fn to_human(&self) -> String {
        let m = &self.0;
        let mut lines = vec![
            format!("Total initiatives: {}", m.total_processes),
            format!("Average revisions per initiative: {:.2}", m.average_revisions_per_process),
            format!(
                "Average time to approval: {}",
                format_duration_secs(m.average_time_to_approval_secs)
            ),
        ];

        let mut status = list_table(&["status", "count"]);
        for (s, count) in &m.status_distribution {
            status.add_row(vec![s.as_str().to_string(), count.to_string()]);
        }
        lines.push(format!("\nBy status:\n{status}"));

        let mut kinds = list_table(&["revision kind", "count"]);
        for (k, count) in &m.revision_type_distribution {
            kinds.add_row(vec![k.as_str().to_string(), count.to_string()]);
        }
        lines.push(format!("\nBy revision kind:\n{kinds}"));

        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct TrendsOutput(pub ProcessTrends);

impl CommandOutput for TrendsOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["day", "created", "draft", "reviewing", "approved", "uploaded"]);
        for (day, created) in &self.0.daily_processes {
            let mut row = vec![day.format("%Y-%m-%d").to_string(), created.to_string()];
            if let Some(statuses) = self.0.status_changes.get(day) {
                row.extend(statuses.values().map(ToString::to_string));
            }
            table.add_row(row);
        }
        table.to_string()
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct PerformanceOutput(pub PerformanceMetrics);

impl CommandOutput for PerformanceOutput {
    fn to_human(&self) -> String {
        let m = &self.0;
        let mut lines = vec![
            format!("Average tasks per initiative: {:.2}", m.average_tasks_per_process),
            format!("Average story points per task: {:.2}", m.average_story_points),
        ];

        let mut kinds = list_table(&["type", "count"]);
        for (kind, count) in &m.task_distribution_by_type {
            kinds.add_row(vec![kind.as_str().to_string(), count.to_string()]);
        }
        lines.push(format!("\nBy type:\n{kinds}"));

        let mut priorities = list_table(&["priority", "count"]);
        for (priority, count) in &m.priority_distribution {
            priorities.add_row(vec![priority.as_str().to_string(), count.to_string()]);
        }
        lines.push(format!("\nBy priority:\n{priorities}"));

        lines.join("\n")
    }
}

fn format_duration_secs(secs: f64) -> String {
    if secs <= 0.0 {
        return "n/a".to_string();
    }
    if secs < 3600.0 {
        format!("{:.1} minutes", secs / 60.0)
    } else if secs < 86_400.0 {
        format!("{:.1} hours", secs / 3600.0)
    } else {
        format!("{:.1} days", secs / 86_400.0)
    }
}

pub async fn execute(args: AnalyticsArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = &ctx.analytics;

    match args.command {
        AnalyticsCommands::Metrics { from, to } => {
            let window = match (from, to) {
                (Some(start), Some(end)) => {
                    if start > end {
                        anyhow::bail!("--from must not be after --to");
                    }
                    Some(TimeWindow::new(start, end))
                }
                _ => None,
            };
            let metrics = service
                .process_metrics(window)
                .await
                .context("Failed to compute process metrics")?;
            output(&MetricsOutput(metrics), json_mode);
        }
        AnalyticsCommands::Trends { days } => {
            let trends = service
                .process_trends(days)
                .await
                .context("Failed to compute process trends")?;
            output(&TrendsOutput(trends), json_mode);
        }
        AnalyticsCommands::Performance => {
            let metrics = service
                .performance_metrics()
                .await
                .context("Failed to compute performance metrics")?;
            output(&PerformanceOutput(metrics), json_mode);
        }
    }

    Ok(())
}
