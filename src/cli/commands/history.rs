//! History CLI commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, CommandOutput};
use crate::services::LoadReport;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommands,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// Index past initiatives from a JSON file
    Load {
        /// JSON array of {id, title, description, category?, priority?, status?}
        file: PathBuf,
    },
}

#[derive(Debug, Serialize)]
pub struct LoadFailure {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct LoadOutput {
    pub loaded: usize,
    pub failed: Vec<LoadFailure>,
}

impl From<LoadReport> for LoadOutput {
    fn from(report: LoadReport) -> Self {
        Self {
            loaded: report.loaded,
            failed: report
                .failed
                .into_iter()
                .map(|(id, reason)| LoadFailure { id, reason })
                .collect(),
        }
    }
}

impl CommandOutput for LoadOutput {
    fn to_human(&self) -> String {
        let mut out = format!("Indexed {} initiative(s).", self.loaded);
        if !self.failed.is_empty() {
            let mut table = list_table(&["id", "reason"]);
            for failure in &self.failed {
                table.add_row(vec![failure.id.clone(), failure.reason.clone()]);
            }
            out.push_str(&format!("\n{} failed:\n{table}", self.failed.len()));
        }
        out
    }
}

pub async fn execute(args: HistoryArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        HistoryCommands::Load { file } => {
            let report = ctx
                .history
                .load_file(&file)
                .await
                .with_context(|| format!("Failed to load history from {}", file.display()))?;
            output(&LoadOutput::from(report), json_mode);
        }
    }
    Ok(())
}
