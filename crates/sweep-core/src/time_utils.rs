/// Formats a Unix instant given in microseconds as a Slack message timestamp
/// (`<seconds>.<six-digit microseconds>`). Instants before the epoch clamp to zero.
pub fn format_slack_ts(unix_micros: i64) -> String {
    let micros = unix_micros.max(0);
    format!("{}.{:06}", micros / 1_000_000, micros % 1_000_000)
}
