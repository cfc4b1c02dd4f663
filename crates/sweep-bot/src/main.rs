//! `threadsweep` binary: loads configuration and runs the Slack sweeper.

mod bootstrap_helpers;
mod startup;

use anyhow::Result;
use clap::Parser;
use sweep_cli::Cli;
use sweep_slack_runtime::run_slack_sweeper;

use crate::bootstrap_helpers::init_tracing;
use crate::startup::build_runtime_config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();
    let config = build_runtime_config(&cli)?;
    tracing::info!(
        slash_command = %config.slash_command,
        shortcut = %config.shortcut_callback_id,
        elevated_credential = config.user_token.is_some(),
        "starting threadsweep"
    );
    run_slack_sweeper(config).await
}
