use anyhow::{bail, Result};

use crate::Cli;

pub fn resolve_non_empty_cli_value(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Rejects configurations the runtime cannot start with.
pub fn validate_cli(cli: &Cli) -> Result<()> {
    if resolve_non_empty_cli_value(cli.slack_app_token.as_deref()).is_none() {
        bail!("--slack-app-token (or SLACK_APP_TOKEN) is required");
    }
    if resolve_non_empty_cli_value(cli.slack_bot_token.as_deref()).is_none() {
        bail!("--slack-bot-token (or SLACK_BOT_TOKEN) is required");
    }
    if cli
        .slack_user_token
        .as_deref()
        .is_some_and(|token| token.trim().is_empty())
    {
        bail!("--slack-user-token cannot be empty when provided");
    }
    if cli.slack_api_base.trim().is_empty() {
        bail!("--slack-api-base cannot be empty");
    }
    if cli.shortcut_callback_id.trim().is_empty() {
        bail!("--shortcut-callback-id cannot be empty");
    }
    let slash_command = cli.slash_command.trim();
    if !slash_command.starts_with('/') || slash_command.len() < 2 {
        bail!("--slash-command must start with '/' followed by a name");
    }
    if slash_command.contains(char::is_whitespace) {
        bail!("--slash-command cannot contain whitespace");
    }
    Ok(())
}
