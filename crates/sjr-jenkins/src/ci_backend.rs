//! Backend-neutral CI contract consumed by the build orchestrator.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Enumerates failures surfaced by a `CiBackend`.
#[derive(Debug, Error)]
pub enum CiError {
    #[error("job {name} was not found on the CI server")]
    JobNotFound { name: String },
    #[error("queued build has not started yet")]
    NotYetStarted,
    #[error("queued build was cancelled before it started")]
    QueueItemCancelled,
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl CiError {
    /// Returns true when polling may simply be retried after a delay.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotYetStarted | Self::Transport(_))
    }
}

/// Outcome recorded by the CI server once a build finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildResult {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
    Other(String),
}

impl BuildResult {
    pub fn from_jenkins(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Self::Success,
            "FAILURE" => Self::Failure,
            "UNSTABLE" => Self::Unstable,
            "ABORTED" => Self::Aborted,
            "NOT_BUILT" => Self::NotBuilt,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Unstable => "UNSTABLE",
            Self::Aborted => "ABORTED",
            Self::NotBuilt => "NOT_BUILT",
            Self::Other(label) => label.as_str(),
        }
    }
}

/// Snapshot of the remote fields re-synchronised by `CiBackend::refresh_status`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildStatus {
    pub building: bool,
    pub elapsed: Duration,
    pub result: Option<BuildResult>,
}

/// Reference to a build request accepted by the CI server but not yet running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItemHandle {
    url: String,
}

impl QueueItemHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Reference to a started build, owned by the orchestrator run that resolved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildHandle {
    number: u64,
    url: String,
    status: BuildStatus,
}

impl BuildHandle {
    pub fn new(number: u64, url: impl Into<String>, status: BuildStatus) -> Self {
        Self {
            number,
            url: url.into(),
            status,
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn result_url(&self) -> &str {
        &self.url
    }

    pub fn is_running(&self) -> bool {
        self.status.building
    }

    pub fn elapsed(&self) -> Duration {
        self.status.elapsed
    }

    /// Finished builds without a recorded result are reported as failures.
    pub fn result(&self) -> BuildResult {
        self.status
            .result
            .clone()
            .unwrap_or_else(|| BuildResult::Other("UNKNOWN".to_string()))
    }

    pub fn update_status(&mut self, status: BuildStatus) {
        self.status = status;
    }
}

/// Result of a successful trigger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredBuild {
    /// Duration of the last successful build, when one exists.
    pub eta: Option<Duration>,
    pub queue_item: QueueItemHandle,
}

/// Façade over the remote build server.
///
/// `trigger_build` enqueues a real remote build and must be called at most once
/// per user request. Every other operation is a read and may be repeated.
#[async_trait]
pub trait CiBackend: Send + Sync {
    /// Base URL users can open to reach the CI server.
    fn server_url(&self) -> &str;

    async fn list_jobs(&self) -> Result<Arc<Vec<String>>, CiError>;

    async fn trigger_build(
        &self,
        job_name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<TriggeredBuild, CiError>;

    /// Fails with `CiError::NotYetStarted` until the queue item has a build.
    async fn resolve_build(&self, queue_item: &QueueItemHandle) -> Result<BuildHandle, CiError>;

    async fn refresh_status(&self, build: &mut BuildHandle) -> Result<(), CiError>;

    async fn console_text(&self, build: &BuildHandle) -> Result<String, CiError>;
}
