use std::time::Duration;

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Returns the time elapsed between `started_unix_ms` and `now_unix_ms`.
///
/// Clock skew between this host and the CI server can put the start in the
/// future; that case reports zero rather than wrapping.
pub fn elapsed_since_unix_ms(started_unix_ms: u64, now_unix_ms: u64) -> Duration {
    Duration::from_millis(now_unix_ms.saturating_sub(started_unix_ms))
}
