use std::time::Duration;

pub const RETRY_ATTEMPT_HEADER: &str = "x-sjr-retry-attempt";

pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Upper bound for any single wait between attempts, including server-provided
/// `Retry-After` values.
pub const MAX_RETRY_DELAY_MS: u64 = 5_000;

pub fn retry_delay(base_delay_ms: u64, attempt: usize, retry_after_seconds: Option<u64>) -> Duration {
    let base_delay_ms = base_delay_ms.max(1);
    let delay_ms = match retry_after_seconds {
        Some(retry_after_seconds) => retry_after_seconds
            .saturating_mul(1_000)
            .max(base_delay_ms),
        None => {
            let exponent = attempt.saturating_sub(1).min(10) as u32;
            base_delay_ms.saturating_mul(1_u64 << exponent)
        }
    };
    Duration::from_millis(delay_ms.min(MAX_RETRY_DELAY_MS))
}

pub fn is_retryable_jenkins_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

pub fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

pub fn truncate_for_error(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Appends a Jenkins API suffix to a resource URL reported by the server.
///
/// Jenkins reports queue and build URLs with a trailing slash; tolerate both.
pub fn resource_api_url(resource_url: &str, suffix: &str) -> String {
    format!(
        "{}/{}",
        resource_url.trim_end_matches('/'),
        suffix.trim_start_matches('/')
    )
}
