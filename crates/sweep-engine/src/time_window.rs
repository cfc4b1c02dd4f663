//! Time-period parsing and cutoff calculation for window sweeps.

use std::{sync::OnceLock, time::Duration};

use chrono::{DateTime, Utc};
use regex::Regex;
use sweep_core::format_slack_ts;
use thiserror::Error;

/// Extra look-back added to every window so messages sitting on the boundary
/// survive clock and history-index skew.
pub const DEFAULT_CUTOFF_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("time period is empty")]
    Empty,
    #[error("unrecognized time period `{0}`")]
    Unrecognized(String),
    #[error("time period `{0}` must be greater than zero")]
    NotPositive(String),
    #[error("time period `{0}` is too large")]
    Overflow(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeriodUnit {
    Minutes,
    Hours,
    Days,
}

impl PeriodUnit {
    fn seconds(self) -> u64 {
        match self {
            Self::Minutes => 60,
            Self::Hours => 60 * 60,
            Self::Days => 24 * 60 * 60,
        }
    }

    fn from_concise(letter: &str) -> Option<Self> {
        match letter {
            "M" | "m" => Some(Self::Minutes),
            "H" | "h" => Some(Self::Hours),
            "D" | "d" => Some(Self::Days),
            _ => None,
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        let word = word.to_ascii_lowercase();
        if word.starts_with("min") {
            Some(Self::Minutes)
        } else if word.starts_with("hour") {
            Some(Self::Hours)
        } else if word.starts_with("day") {
            Some(Self::Days)
        } else {
            None
        }
    }
}

fn concise_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([0-9]+)([HhDdMm])$").expect("concise period pattern"))
}

fn verbose_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^([0-9]+)\s*(hours?|min(?:ute)?s?|days?)$").expect("verbose period pattern")
    })
}

/// Parses `2H`, `15m`, `3d`, `2 hours`, `30 minutes`, `1day` and friends.
///
/// The concise single-letter family is tried first, then the verbose
/// case-insensitive word family. The amount must be a positive integer.
pub fn parse_time_window(text: &str) -> Result<Duration, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let (amount, unit) = if let Some(captures) = concise_pattern().captures(trimmed) {
        (captures[1].to_string(), PeriodUnit::from_concise(&captures[2]))
    } else if let Some(captures) = verbose_pattern().captures(trimmed) {
        (captures[1].to_string(), PeriodUnit::from_word(&captures[2]))
    } else {
        return Err(ParseError::Unrecognized(trimmed.to_string()));
    };
    let unit = unit.ok_or_else(|| ParseError::Unrecognized(trimmed.to_string()))?;

    let amount = amount
        .parse::<u64>()
        .map_err(|_| ParseError::Overflow(trimmed.to_string()))?;
    if amount == 0 {
        return Err(ParseError::NotPositive(trimmed.to_string()));
    }
    let seconds = amount
        .checked_mul(unit.seconds())
        .ok_or_else(|| ParseError::Overflow(trimmed.to_string()))?;
    Ok(Duration::from_secs(seconds))
}

/// Oldest Slack timestamp covered by a window: `now - window - grace`.
pub fn cutoff_timestamp(window: Duration, grace: Duration, now: DateTime<Utc>) -> String {
    let look_back = window.saturating_add(grace);
    let look_back_micros = i64::try_from(look_back.as_micros()).unwrap_or(i64::MAX);
    format_slack_ts(now.timestamp_micros().saturating_sub(look_back_micros))
}
