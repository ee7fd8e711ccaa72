use clap::{ArgAction, Parser};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "sjr",
    about = "Trigger Jenkins builds from Slack slash commands",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "SJR_BIND",
        default_value = "0.0.0.0:5000",
        help = "Socket address the slash command endpoint listens on"
    )]
    pub bind: String,

    #[arg(
        long = "slack-token",
        env = "SJR_SLACK_TOKEN",
        hide_env_values = true,
        help = "Verification token Slack sends with every slash command"
    )]
    pub slack_token: String,

    #[arg(
        long = "slack-timeout-seconds",
        env = "SJR_SLACK_TIMEOUT_SECONDS",
        default_value_t = 28 * 60,
        value_parser = parse_positive_u64,
        help = "Seconds after a command during which build updates are still posted to its response_url"
    )]
    pub slack_timeout_seconds: u64,

    #[arg(
        long = "jenkins-url",
        env = "SJR_JENKINS_URL",
        default_value = "http://jenkins",
        help = "Base URL of the Jenkins server"
    )]
    pub jenkins_url: String,

    #[arg(
        long = "jenkins-username",
        env = "SJR_JENKINS_USERNAME",
        help = "Jenkins user for basic authentication"
    )]
    pub jenkins_username: Option<String>,

    #[arg(
        long = "jenkins-password",
        env = "SJR_JENKINS_PASSWORD",
        hide_env_values = true,
        help = "Jenkins password or API token for basic authentication"
    )]
    pub jenkins_password: Option<String>,

    #[arg(
        long = "jenkins-uppercase-params",
        env = "SJR_JENKINS_UPPERCASE_PARAMS",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Uppercase build parameter names before sending them to Jenkins"
    )]
    pub jenkins_uppercase_params: bool,

    #[arg(
        long = "jenkins-request-timeout-ms",
        env = "SJR_JENKINS_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Timeout for each HTTP request to Jenkins and Slack"
    )]
    pub jenkins_request_timeout_ms: u64,

    #[arg(
        long = "jenkins-retry-max-attempts",
        env = "SJR_JENKINS_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts for read-only Jenkins requests. Build triggers are never retried"
    )]
    pub jenkins_retry_max_attempts: usize,

    #[arg(
        long = "jenkins-retry-base-delay-ms",
        env = "SJR_JENKINS_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base delay for exponential backoff between Jenkins read retries"
    )]
    pub jenkins_retry_base_delay_ms: u64,

    #[arg(
        long = "job-cache-ttl-seconds",
        env = "SJR_JOB_CACHE_TTL_SECONDS",
        default_value_t = 30,
        value_parser = parse_positive_u64,
        help = "How long the Jenkins job list is reused before it is fetched again"
    )]
    pub job_cache_ttl_seconds: u64,

    #[arg(
        long = "poll-interval-ms",
        env = "SJR_POLL_INTERVAL_MS",
        default_value_t = 5_000,
        value_parser = parse_positive_u64,
        help = "Interval between queue and build status polls"
    )]
    pub poll_interval_ms: u64,

    #[arg(
        long = "test-mode",
        env = "SJR_TEST_MODE",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Log Slack notifications instead of delivering them"
    )]
    pub test_mode: bool,

    #[arg(
        long,
        env = "SJR_DEBUG",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Raise the default log level to DEBUG"
    )]
    pub debug: bool,
}
