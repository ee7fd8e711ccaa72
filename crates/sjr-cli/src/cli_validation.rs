use std::net::SocketAddr;

use anyhow::{bail, Result};

use crate::cli_args::Cli;

fn resolve_non_empty_cli_value(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Rejects configurations the bridge cannot start with.
pub fn validate_cli(cli: &Cli) -> Result<()> {
    if cli.slack_token.trim().is_empty() {
        bail!("--slack-token cannot be empty");
    }
    if cli.bind.parse::<SocketAddr>().is_err() {
        bail!("--bind must be a socket address such as 0.0.0.0:5000");
    }
    let jenkins_url = cli.jenkins_url.trim();
    if !(jenkins_url.starts_with("http://") || jenkins_url.starts_with("https://")) {
        bail!("--jenkins-url must start with http:// or https://");
    }
    if resolve_non_empty_cli_value(cli.jenkins_password.as_deref()).is_some()
        && resolve_non_empty_cli_value(cli.jenkins_username.as_deref()).is_none()
    {
        bail!("--jenkins-password requires --jenkins-username");
    }
    if cli.slack_timeout_seconds == 0 {
        bail!("--slack-timeout-seconds must be greater than 0");
    }
    if cli.poll_interval_ms == 0 {
        bail!("--poll-interval-ms must be greater than 0");
    }
    if cli.jenkins_request_timeout_ms == 0 {
        bail!("--jenkins-request-timeout-ms must be greater than 0");
    }
    if cli.jenkins_retry_max_attempts == 0 {
        bail!("--jenkins-retry-max-attempts must be greater than 0");
    }
    if cli.job_cache_ttl_seconds == 0 {
        bail!("--job-cache-ttl-seconds must be greater than 0");
    }
    Ok(())
}
