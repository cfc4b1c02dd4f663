//! Foundational low-level utilities shared across threadsweep crates.
//!
//! Provides the Slack timestamp formatting used by cutoff calculations
//! and the text truncation helpers used by logging and notice rendering.

pub mod text_utils;
pub mod time_utils;

pub use text_utils::{clip_text, preview_text};
pub use time_utils::format_slack_ts;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_slack_ts_pads_microseconds() {
        assert_eq!(format_slack_ts(1_700_000_000_000_042), "1700000000.000042");
        assert_eq!(format_slack_ts(5_123_456), "5.123456");
        assert_eq!(format_slack_ts(0), "0.000000");
    }

    #[test]
    fn format_slack_ts_clamps_negative_instants_to_epoch() {
        assert_eq!(format_slack_ts(-10), "0.000000");
    }

    #[test]
    fn clip_text_keeps_short_values_and_cuts_on_char_boundaries() {
        assert_eq!(clip_text("short", 5), "short");
        assert_eq!(clip_text("exactly", 7), "exactly");
        assert_eq!(clip_text("caf\u{e9} au lait", 4), "caf\u{e9}...");
        assert_eq!(clip_text("\u{1F9F9}\u{1F9F9}\u{1F9F9}", 1), "\u{1F9F9}...");
        assert_eq!(clip_text("anything", 0), "...");
    }

    #[test]
    fn preview_text_collapses_whitespace_and_truncates() {
        assert_eq!(preview_text("  hello \n\n world  ", 40), "hello world");
        assert_eq!(preview_text("abcdefgh", 3), "abc...");
        assert_eq!(preview_text("", 10), "");
    }
}
