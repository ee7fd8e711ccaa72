use std::collections::BTreeMap;
use std::time::Duration;

use chrono::TimeDelta;

/// Slack truncates message text beyond 40k characters; keep headroom.
pub const SLACK_TEXT_MAX_CHARS: usize = 39_000;

const NO_TIME: &str = "no time";
const USING_DEFAULTS: &str = "using defaults";
const ETA_UNKNOWN: &str = "unknown";

/// Renders a duration as `H hours M minutes S seconds`, skipping zero parts.
///
/// Zero, negative and sub-second durations render as `no time`.
pub fn format_duration(delta: TimeDelta) -> String {
    let total_seconds = delta.num_seconds();
    if total_seconds <= 0 {
        return NO_TIME.to_string();
    }

    let hours = total_seconds / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    [(hours, "hour"), (minutes, "minute"), (seconds, "second")]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, unit)| {
            if count == 1 {
                format!("{count} {unit}")
            } else {
                format!("{count} {unit}s")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_std_duration(duration: Duration) -> String {
    format_duration(TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX))
}

pub fn format_eta(eta: Option<TimeDelta>) -> String {
    match eta {
        Some(eta) => format_duration(eta),
        None => ETA_UNKNOWN.to_string(),
    }
}

/// Renders parameters as comma-joined `` `KEY=value` `` tokens.
pub fn format_params(params: &BTreeMap<String, String>) -> String {
    if params.is_empty() {
        return USING_DEFAULTS.to_string();
    }
    params
        .iter()
        .map(|(key, value)| format!("`{key}={value}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Keeps the tail of console output so the failing steps stay visible.
pub fn truncate_console_for_slack(console: &str, max_chars: usize) -> String {
    let total_chars = console.chars().count();
    if total_chars <= max_chars {
        return console.to_string();
    }
    let tail = console
        .chars()
        .skip(total_chars - max_chars)
        .collect::<String>();
    format!("...{tail}")
}
