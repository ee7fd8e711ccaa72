//! Builds the runtime graph from parsed configuration and serves it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sjr_gateway::{run_bridge_server, BridgeServerConfig, BridgeServerState};
use sjr_jenkins::{JenkinsApiClient, JenkinsClientConfig};
use sjr_orchestrator::{BuildOrchestrator, BuildOrchestratorConfig, TokioDetachedRunner};
use sjr_slack::{ParamNameCase, ResponseUrlNotifier};

use crate::cli_args::Cli;
use crate::cli_validation::validate_cli;

pub fn jenkins_client_config(cli: &Cli) -> JenkinsClientConfig {
    JenkinsClientConfig {
        base_url: cli.jenkins_url.trim().to_string(),
        username: non_empty(cli.jenkins_username.as_deref()),
        password: non_empty(cli.jenkins_password.as_deref()),
        request_timeout_ms: cli.jenkins_request_timeout_ms,
        retry_max_attempts: cli.jenkins_retry_max_attempts,
        retry_base_delay_ms: cli.jenkins_retry_base_delay_ms,
        job_cache_ttl: Duration::from_secs(cli.job_cache_ttl_seconds),
    }
}

pub fn orchestrator_config(cli: &Cli) -> BuildOrchestratorConfig {
    BuildOrchestratorConfig {
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
        response_timeout: Duration::from_secs(cli.slack_timeout_seconds),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn build_bridge_state(cli: &Cli) -> Result<BridgeServerState> {
    let ci = Arc::new(
        JenkinsApiClient::new(jenkins_client_config(cli))
            .context("failed to configure jenkins client")?,
    );
    let notifier = Arc::new(
        ResponseUrlNotifier::new(cli.jenkins_request_timeout_ms, cli.test_mode)
            .context("failed to configure slack notifier")?,
    );
    let orchestrator = BuildOrchestrator::new(ci.clone(), notifier, orchestrator_config(cli));

    Ok(BridgeServerState {
        slack_token: cli.slack_token.trim().to_string(),
        param_case: ParamNameCase::from_uppercase_flag(cli.jenkins_uppercase_params),
        ci,
        orchestrator,
        runner: Arc::new(TokioDetachedRunner),
    })
}

pub async fn run_cli(cli: Cli) -> Result<()> {
    validate_cli(&cli)?;
    if cli.test_mode {
        tracing::warn!("test mode enabled: slack notifications are logged, not sent");
    }
    let state = build_bridge_state(&cli)?;
    run_bridge_server(
        BridgeServerConfig {
            bind: cli.bind.clone(),
        },
        state,
    )
    .await
}
