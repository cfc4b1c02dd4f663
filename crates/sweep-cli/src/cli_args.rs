use clap::Parser;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "threadsweep",
    about = "Slack moderation bot that deletes messages together with their threads",
    version
)]
pub struct Cli {
    #[arg(
        long = "slack-app-token",
        env = "SLACK_APP_TOKEN",
        hide_env_values = true,
        help = "Slack Socket Mode app token (xapp-...)"
    )]
    pub slack_app_token: Option<String>,

    #[arg(
        long = "slack-bot-token",
        env = "SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Slack bot token for Web API (xoxb-...)"
    )]
    pub slack_bot_token: Option<String>,

    #[arg(
        long = "slack-user-token",
        env = "SLACK_USER_TOKEN",
        hide_env_values = true,
        help = "Optional user token (xoxp-...) of a workspace admin; lets admins delete other users' messages"
    )]
    pub slack_user_token: Option<String>,

    #[arg(
        long = "slack-bot-user-id",
        env = "SLACK_BOT_USER_ID",
        help = "Optional bot user id; resolved with auth.test when omitted"
    )]
    pub slack_bot_user_id: Option<String>,

    #[arg(
        long = "slack-api-base",
        env = "SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Slack Web API base URL"
    )]
    pub slack_api_base: String,

    #[arg(
        long = "slack-request-timeout-ms",
        env = "SLACK_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Timeout for each Slack Web API request in milliseconds"
    )]
    pub slack_request_timeout_ms: u64,

    #[arg(
        long = "slack-retry-max-attempts",
        env = "SLACK_RETRY_MAX_ATTEMPTS",
        default_value_t = 4,
        value_parser = parse_positive_usize,
        help = "Maximum attempts for retryable Slack API failures (429/5xx/transport)"
    )]
    pub slack_retry_max_attempts: usize,

    #[arg(
        long = "slack-retry-base-delay-ms",
        env = "SLACK_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base backoff delay in milliseconds for Slack API retries"
    )]
    pub slack_retry_base_delay_ms: u64,

    #[arg(
        long = "slack-reconnect-delay-ms",
        env = "SLACK_RECONNECT_DELAY_MS",
        default_value_t = 1_000,
        value_parser = parse_positive_u64,
        help = "Delay before reconnecting after a Socket Mode session ends"
    )]
    pub slack_reconnect_delay_ms: u64,

    #[arg(
        long = "slack-processed-envelope-cap",
        env = "SLACK_PROCESSED_ENVELOPE_CAP",
        default_value_t = 10_000,
        value_parser = parse_positive_usize,
        help = "Maximum envelope ids remembered for duplicate delivery protection"
    )]
    pub slack_processed_envelope_cap: usize,

    #[arg(
        long = "shortcut-callback-id",
        env = "SWEEP_SHORTCUT_CALLBACK_ID",
        default_value = "delete-message-with-all-threads",
        help = "Callback id of the message shortcut that deletes a thread"
    )]
    pub shortcut_callback_id: String,

    #[arg(
        long = "slash-command",
        env = "SWEEP_SLASH_COMMAND",
        default_value = "/sweep",
        help = "Slash command that deletes threads posted within a time period"
    )]
    pub slash_command: String,

    #[arg(
        long = "history-limit",
        env = "SWEEP_HISTORY_LIMIT",
        default_value_t = 200,
        value_parser = parse_positive_usize,
        help = "Maximum channel history messages examined per slash command"
    )]
    pub history_limit: usize,

    #[arg(
        long = "sweep-all-subtypes",
        env = "SWEEP_ALL_SUBTYPES",
        default_value_t = false,
        help = "Let the slash command delete every message in the period, not only tombstoned thread parents"
    )]
    pub sweep_all_subtypes: bool,
}
