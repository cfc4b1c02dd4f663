use std::time::Duration;

use anyhow::{anyhow, Result};
use sweep_cli::{resolve_non_empty_cli_value, validate_cli, Cli};
use sweep_engine::{CandidateFilter, OrchestratorConfig};
use sweep_slack_runtime::SlackSweepRuntimeConfig;

/// Builds the runtime configuration from validated command line values.
pub(crate) fn build_runtime_config(cli: &Cli) -> Result<SlackSweepRuntimeConfig> {
    validate_cli(cli)?;
    let app_token = resolve_non_empty_cli_value(cli.slack_app_token.as_deref())
        .ok_or_else(|| anyhow!("--slack-app-token (or SLACK_APP_TOKEN) is required"))?;
    let bot_token = resolve_non_empty_cli_value(cli.slack_bot_token.as_deref())
        .ok_or_else(|| anyhow!("--slack-bot-token (or SLACK_BOT_TOKEN) is required"))?;

    let candidate_filter = if cli.sweep_all_subtypes {
        CandidateFilter::AllMessages
    } else {
        CandidateFilter::TombstonesOnly
    };

    Ok(SlackSweepRuntimeConfig {
        api_base: cli.slack_api_base.trim().to_string(),
        app_token,
        bot_token,
        user_token: resolve_non_empty_cli_value(cli.slack_user_token.as_deref()),
        bot_user_id: resolve_non_empty_cli_value(cli.slack_bot_user_id.as_deref()),
        request_timeout_ms: cli.slack_request_timeout_ms.max(1),
        retry_max_attempts: cli.slack_retry_max_attempts.max(1),
        retry_base_delay_ms: cli.slack_retry_base_delay_ms.max(1),
        reconnect_delay: Duration::from_millis(cli.slack_reconnect_delay_ms.max(1)),
        processed_envelope_cap: cli.slack_processed_envelope_cap.max(1),
        shortcut_callback_id: cli.shortcut_callback_id.trim().to_string(),
        slash_command: cli.slash_command.trim().to_string(),
        orchestrator: OrchestratorConfig {
            history_limit: cli.history_limit.max(1),
            candidate_filter,
            ..OrchestratorConfig::default()
        },
    })
}
