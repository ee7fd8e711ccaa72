//! Per-request build lifecycle.
//!
//! One `BuildRun` walks `Requested -> Queued -> Running -> Completed`, or stops
//! early in `NotFound` or `TimedOut`. Each call to `BuildOrchestrator::step`
//! performs exactly one transition so the machine can be driven and inspected
//! one phase at a time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::TimeDelta;
use sjr_jenkins::{BuildHandle, BuildResult, CiBackend, CiError, QueueItemHandle};
use sjr_slack::{
    build_completed_messages, build_requested_message, build_started_message, format_eta,
    job_not_found_message, BuildNotice, CompletedBuildSummary, Notifier, ParsedCommand,
    SlackMessage,
};
use tokio::time::Instant;

use crate::command_request::CommandRequest;

/// Slack stops accepting `response_url` posts 30 minutes after the command.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(28 * 60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOrchestratorConfig {
    pub poll_interval: Duration,
    /// Deadline measured from `BuildRun::received_at`.
    pub response_timeout: Duration,
}

impl Default for BuildOrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

/// A validated build request plus the instant it reached the bridge.
#[derive(Debug, Clone)]
pub struct BuildRun {
    pub request: CommandRequest,
    pub command: ParsedCommand,
    pub received_at: Instant,
}

impl BuildRun {
    pub fn new(request: CommandRequest, command: ParsedCommand) -> Self {
        Self {
            request,
            command,
            received_at: Instant::now(),
        }
    }

    fn notice<'a>(&'a self, server_url: &'a str) -> BuildNotice<'a> {
        BuildNotice {
            job_name: &self.command.job_name,
            params: &self.command.params,
            requester: self.request.requester(),
            server_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildPhase {
    Requested,
    Queued {
        queue_item: QueueItemHandle,
        eta: Option<TimeDelta>,
    },
    Running {
        build: BuildHandle,
        eta: Option<TimeDelta>,
        running_since: Instant,
    },
    Completed {
        build: BuildHandle,
    },
    NotFound,
    TimedOut,
}

impl BuildPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Queued { .. } => "queued",
            Self::Running { .. } => "running",
            Self::Completed { .. } => "completed",
            Self::NotFound => "not_found",
            Self::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::NotFound | Self::TimedOut
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildRunOutcome {
    Completed {
        number: u64,
        result: BuildResult,
        elapsed: Duration,
    },
    NotFound,
    TimedOut,
}

/// Estimated time left, given the original estimate and time spent running.
pub fn remaining_eta(eta: Option<TimeDelta>, running_for: Duration) -> Option<TimeDelta> {
    let running_for = TimeDelta::from_std(running_for).unwrap_or(TimeDelta::MAX);
    eta.map(|eta| eta - running_for)
}

/// Drives build requests through the CI backend and reports each phase.
#[derive(Clone)]
pub struct BuildOrchestrator {
    ci: Arc<dyn CiBackend>,
    notifier: Arc<dyn Notifier>,
    config: BuildOrchestratorConfig,
}

impl BuildOrchestrator {
    pub fn new(
        ci: Arc<dyn CiBackend>,
        notifier: Arc<dyn Notifier>,
        config: BuildOrchestratorConfig,
    ) -> Self {
        Self {
            ci,
            notifier,
            config,
        }
    }

    /// Runs `run` to a terminal phase.
    ///
    /// Errors only surface for conditions polling cannot recover from, such as
    /// a failed trigger call or a cancelled queue item.
    pub async fn run(&self, run: &BuildRun) -> Result<BuildRunOutcome> {
        let mut phase = BuildPhase::Requested;
        while !phase.is_terminal() {
            let previous = phase.label();
            phase = self.step(run, phase).await?;
            if phase.label() != previous {
                tracing::debug!(
                    job = %run.command.job_name,
                    from = previous,
                    to = phase.label(),
                    "build phase transition"
                );
            }
        }

        Ok(match phase {
            BuildPhase::Completed { build } => BuildRunOutcome::Completed {
                number: build.number(),
                result: build.result(),
                elapsed: build.elapsed(),
            },
            BuildPhase::NotFound => BuildRunOutcome::NotFound,
            _ => BuildRunOutcome::TimedOut,
        })
    }

    /// Performs one transition. Terminal phases are returned unchanged.
    pub async fn step(&self, run: &BuildRun, phase: BuildPhase) -> Result<BuildPhase> {
        match phase {
            BuildPhase::Requested => self.trigger(run).await,
            BuildPhase::Queued { queue_item, eta } => self.poll_queue(run, queue_item, eta).await,
            BuildPhase::Running {
                build,
                eta,
                running_since,
            } => self.poll_running(run, build, eta, running_since).await,
            terminal => Ok(terminal),
        }
    }

    async fn trigger(&self, run: &BuildRun) -> Result<BuildPhase> {
        let server_url = self.ci.server_url();
        self.send(run, &build_requested_message(run.notice(server_url)))
            .await;

        match self
            .ci
            .trigger_build(&run.command.job_name, &run.command.params)
            .await
        {
            Ok(triggered) => {
                tracing::info!(
                    job = %run.command.job_name,
                    requester = %run.request.requester_with_channel(),
                    queue_item = triggered.queue_item.url(),
                    "build enqueued"
                );
                Ok(BuildPhase::Queued {
                    queue_item: triggered.queue_item,
                    eta: triggered
                        .eta
                        .map(|eta| TimeDelta::from_std(eta).unwrap_or(TimeDelta::MAX)),
                })
            }
            Err(CiError::JobNotFound { name }) => {
                tracing::info!(job = %name, "requested job does not exist");
                self.send(run, &job_not_found_message(&name)).await;
                Ok(BuildPhase::NotFound)
            }
            Err(error) => Err(error).with_context(|| {
                format!("failed to trigger build of {}", run.command.job_name)
            }),
        }
    }

    async fn poll_queue(
        &self,
        run: &BuildRun,
        queue_item: QueueItemHandle,
        eta: Option<TimeDelta>,
    ) -> Result<BuildPhase> {
        match self.ci.resolve_build(&queue_item).await {
            Ok(build) => {
                let server_url = self.ci.server_url();
                self.send(run, &build_started_message(run.notice(server_url), eta))
                    .await;
                tracing::info!(
                    job = %run.command.job_name,
                    build = build.number(),
                    "build started"
                );
                Ok(BuildPhase::Running {
                    build,
                    eta,
                    running_since: Instant::now(),
                })
            }
            Err(error) if error.is_transient() => {
                if !matches!(error, CiError::NotYetStarted) {
                    tracing::warn!(
                        job = %run.command.job_name,
                        error = %format!("{error:#}"),
                        "queue poll failed; retrying"
                    );
                }
                tokio::time::sleep(self.config.poll_interval).await;
                if self.deadline_exceeded(run) {
                    self.log_timeout(run, "queued");
                    return Ok(BuildPhase::TimedOut);
                }
                Ok(BuildPhase::Queued { queue_item, eta })
            }
            Err(error) => Err(error).with_context(|| {
                format!("build of {} never started", run.command.job_name)
            }),
        }
    }

    async fn poll_running(
        &self,
        run: &BuildRun,
        mut build: BuildHandle,
        eta: Option<TimeDelta>,
        running_since: Instant,
    ) -> Result<BuildPhase> {
        if let Err(error) = self.ci.refresh_status(&mut build).await {
            if !error.is_transient() {
                return Err(error).with_context(|| {
                    format!("failed to poll build {}", build.number())
                });
            }
            tracing::warn!(
                job = %run.command.job_name,
                build = build.number(),
                error = %format!("{error:#}"),
                "build status refresh failed; retrying"
            );
        } else if !build.is_running() {
            self.report_completed(run, &build).await;
            return Ok(BuildPhase::Completed { build });
        }

        tracing::debug!(
            job = %run.command.job_name,
            build = build.number(),
            eta = %format_eta(remaining_eta(eta, running_since.elapsed())),
            "build still running"
        );
        tokio::time::sleep(self.config.poll_interval).await;
        if self.deadline_exceeded(run) {
            self.log_timeout(run, "running");
            return Ok(BuildPhase::TimedOut);
        }
        Ok(BuildPhase::Running {
            build,
            eta,
            running_since,
        })
    }

    async fn report_completed(&self, run: &BuildRun, build: &BuildHandle) {
        let result = build.result();
        let succeeded = result.is_success();
        let console = if succeeded {
            None
        } else {
            match self.ci.console_text(build).await {
                Ok(console) => Some(console),
                Err(error) => {
                    tracing::warn!(
                        build = build.number(),
                        error = %format!("{error:#}"),
                        "failed to fetch console output"
                    );
                    None
                }
            }
        };
        tracing::info!(
            job = %run.command.job_name,
            build = build.number(),
            result = result.label(),
            "build finished"
        );

        let server_url = self.ci.server_url();
        let messages = build_completed_messages(
            run.notice(server_url),
            CompletedBuildSummary {
                succeeded,
                result_label: result.label(),
                result_url: build.result_url(),
                elapsed: build.elapsed(),
            },
            console.as_deref(),
        );
        for message in &messages {
            self.send(run, message).await;
        }
    }

    async fn send(&self, run: &BuildRun, message: &SlackMessage) {
        self.notifier
            .notify(&run.request.response_url, message)
            .await;
    }

    fn deadline_exceeded(&self, run: &BuildRun) -> bool {
        run.received_at.elapsed() > self.config.response_timeout
    }

    fn log_timeout(&self, run: &BuildRun, phase: &str) {
        tracing::warn!(
            job = %run.command.job_name,
            phase,
            timeout_secs = self.config.response_timeout.as_secs(),
            "slack response window elapsed; giving up on build updates"
        );
    }
}
