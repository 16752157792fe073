//! SmartSpec CLI entry point.

use anyhow::Result;
use clap::Parser;

use smartspec::cli::commands::{analytics, history, initiative};
use smartspec::cli::{handle_error, AppContext, Cli, Commands};
use smartspec::infrastructure::config::ConfigLoader;
use smartspec::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json_mode);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    let ctx = AppContext::build(&config).await?;

    match cli.command {
        Commands::Initiative(args) => initiative::execute(args, &ctx, cli.json).await,
        Commands::Analytics(args) => analytics::execute(args, &ctx, cli.json).await,
        Commands::History(args) => history::execute(args, &ctx, cli.json).await,
    }
}
