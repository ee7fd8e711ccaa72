//! Orchestrator tests against a scripted CI backend.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use sjr_jenkins::{
    BuildHandle, BuildResult, BuildStatus, CiBackend, CiError, QueueItemHandle, TriggeredBuild,
};
use sjr_slack::{Notifier, ParsedCommand, SlackMessage};

use crate::{
    remaining_eta, BuildOrchestrator, BuildOrchestratorConfig, BuildPhase, BuildRun,
    BuildRunOutcome, CommandRequest,
};

const SERVER_URL: &str = "http://jenkins.test";
const RESPONSE_URL: &str = "https://hooks.slack.test/commands/1";

#[derive(Default)]
struct FakeCiState {
    trigger_calls: usize,
    resolve_calls: usize,
    refresh_calls: usize,
    console_calls: usize,
}

/// Scripted backend: resolve answers come from `queue_script`, refresh answers
/// from `status_script`. The last entry of each script repeats forever.
struct FakeCi {
    jobs: Vec<String>,
    eta: Option<Duration>,
    queue_script: Mutex<VecDeque<QueueStep>>,
    status_script: Mutex<VecDeque<StatusStep>>,
    console: String,
    state: Mutex<FakeCiState>,
}

#[derive(Clone)]
enum QueueStep {
    Waiting,
    TransportError,
    Cancelled,
    Started,
}

#[derive(Clone)]
enum StatusStep {
    Running,
    TransportError,
    Finished(BuildResult, Duration),
}

impl FakeCi {
    fn new(queue: Vec<QueueStep>, status: Vec<StatusStep>) -> Self {
        Self {
            jobs: vec!["deploy".to_string()],
            eta: Some(Duration::from_secs(120)),
            queue_script: Mutex::new(queue.into()),
            status_script: Mutex::new(status.into()),
            console: "Started by bot\nFinished: FAILURE\n".to_string(),
            state: Mutex::new(FakeCiState::default()),
        }
    }

    fn next<T: Clone>(script: &Mutex<VecDeque<T>>) -> T {
        let mut script = script.lock().expect("script lock");
        if script.len() > 1 {
            script.pop_front().expect("script entry")
        } else {
            script.front().cloned().expect("script entry")
        }
    }

    fn counts(&self) -> (usize, usize, usize, usize) {
        let state = self.state.lock().expect("state lock");
        (
            state.trigger_calls,
            state.resolve_calls,
            state.refresh_calls,
            state.console_calls,
        )
    }
}

#[async_trait]
impl CiBackend for FakeCi {
    fn server_url(&self) -> &str {
        SERVER_URL
    }

    async fn list_jobs(&self) -> Result<Arc<Vec<String>>, CiError> {
        Ok(Arc::new(self.jobs.clone()))
    }

    async fn trigger_build(
        &self,
        job_name: &str,
        _params: &BTreeMap<String, String>,
    ) -> Result<TriggeredBuild, CiError> {
        if !self.jobs.iter().any(|job| job == job_name) {
            return Err(CiError::JobNotFound {
                name: job_name.to_string(),
            });
        }
        self.state.lock().expect("state lock").trigger_calls += 1;
        Ok(TriggeredBuild {
            eta: self.eta,
            queue_item: QueueItemHandle::new(format!("{SERVER_URL}/queue/item/7/")),
        })
    }

    async fn resolve_build(&self, _queue_item: &QueueItemHandle) -> Result<BuildHandle, CiError> {
        self.state.lock().expect("state lock").resolve_calls += 1;
        match Self::next(&self.queue_script) {
            QueueStep::Waiting => Err(CiError::NotYetStarted),
            QueueStep::TransportError => Err(CiError::Transport(anyhow::anyhow!("queue 502"))),
            QueueStep::Cancelled => Err(CiError::QueueItemCancelled),
            QueueStep::Started => Ok(BuildHandle::new(
                42,
                format!("{SERVER_URL}/job/deploy/42/"),
                BuildStatus {
                    building: true,
                    ..BuildStatus::default()
                },
            )),
        }
    }

    async fn refresh_status(&self, build: &mut BuildHandle) -> Result<(), CiError> {
        self.state.lock().expect("state lock").refresh_calls += 1;
        match Self::next(&self.status_script) {
            StatusStep::Running => {
                build.update_status(BuildStatus {
                    building: true,
                    elapsed: Duration::from_secs(1),
                    result: None,
                });
                Ok(())
            }
            StatusStep::TransportError => Err(CiError::Transport(anyhow::anyhow!("status 502"))),
            StatusStep::Finished(result, elapsed) => {
                build.update_status(BuildStatus {
                    building: false,
                    elapsed,
                    result: Some(result),
                });
                Ok(())
            }
        }
    }

    async fn console_text(&self, _build: &BuildHandle) -> Result<String, CiError> {
        self.state.lock().expect("state lock").console_calls += 1;
        Ok(self.console.clone())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, SlackMessage)>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<SlackMessage> {
        self.sent
            .lock()
            .expect("sent lock")
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    fn titles(&self) -> Vec<String> {
        self.messages()
            .iter()
            .map(|message| {
                message
                    .attachments
                    .first()
                    .and_then(|attachment| attachment.title.clone())
                    .or_else(|| message.text.clone())
                    .unwrap_or_default()
            })
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, response_url: &str, message: &SlackMessage) {
        self.sent
            .lock()
            .expect("sent lock")
            .push((response_url.to_string(), message.clone()));
    }
}

fn fast_config() -> BuildOrchestratorConfig {
    BuildOrchestratorConfig {
        poll_interval: Duration::from_millis(2),
        response_timeout: Duration::from_secs(5),
    }
}

fn build_run(job_name: &str) -> BuildRun {
    BuildRun::new(
        CommandRequest {
            token: "token".to_string(),
            command: "/build".to_string(),
            text: format!("{job_name} --ENV=prod"),
            user_name: "alice".to_string(),
            channel_name: "ops".to_string(),
            response_url: RESPONSE_URL.to_string(),
        },
        ParsedCommand {
            job_name: job_name.to_string(),
            params: BTreeMap::from([("ENV".to_string(), "prod".to_string())]),
        },
    )
}

fn orchestrator(
    ci: &Arc<FakeCi>,
    notifier: &Arc<RecordingNotifier>,
    config: BuildOrchestratorConfig,
) -> BuildOrchestrator {
    BuildOrchestrator::new(ci.clone(), notifier.clone(), config)
}

#[test]
fn unit_remaining_eta_counts_down_and_may_go_negative() {
    assert_eq!(
        remaining_eta(Some(TimeDelta::seconds(120)), Duration::from_secs(20)),
        Some(TimeDelta::seconds(100))
    );
    assert_eq!(
        remaining_eta(Some(TimeDelta::seconds(10)), Duration::from_secs(25)),
        Some(TimeDelta::seconds(-15))
    );
    assert_eq!(remaining_eta(None, Duration::from_secs(5)), None);
}

#[test]
fn unit_build_phase_terminal_classification() {
    assert!(!BuildPhase::Requested.is_terminal());
    assert!(BuildPhase::NotFound.is_terminal());
    assert!(BuildPhase::TimedOut.is_terminal());
    assert_eq!(BuildPhase::TimedOut.label(), "timed_out");
}

#[tokio::test]
async fn functional_successful_build_reports_requested_started_and_completed() {
    let ci = Arc::new(FakeCi::new(
        vec![QueueStep::Waiting, QueueStep::Waiting, QueueStep::Started],
        vec![
            StatusStep::Running,
            StatusStep::Finished(BuildResult::Success, Duration::from_secs(95)),
        ],
    ));
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = orchestrator(&ci, &notifier, fast_config())
        .run(&build_run("deploy"))
        .await
        .expect("run");

    assert_eq!(
        outcome,
        BuildRunOutcome::Completed {
            number: 42,
            result: BuildResult::Success,
            elapsed: Duration::from_secs(95),
        }
    );
    assert_eq!(
        notifier.titles(),
        vec![
            "alice requested build of deploy".to_string(),
            "Started building deploy".to_string(),
            "Built deploy, result was a SUCCESS".to_string(),
        ]
    );
    let messages = notifier.messages();
    assert_eq!(
        messages[1].attachments[0].text,
        "Jenkins is now building deploy (`ENV=prod`). ETA in 2 minutes"
    );
    assert_eq!(
        messages[2].attachments[0].title_link.as_deref(),
        Some("http://jenkins.test/job/deploy/42/")
    );
    assert!(notifier
        .sent
        .lock()
        .expect("sent lock")
        .iter()
        .all(|(url, _)| url == RESPONSE_URL));
    let (trigger_calls, resolve_calls, _, console_calls) = ci.counts();
    assert_eq!(trigger_calls, 1);
    assert_eq!(resolve_calls, 3);
    assert_eq!(console_calls, 0);
}

#[tokio::test]
async fn functional_failed_build_appends_console_output() {
    let ci = Arc::new(FakeCi::new(
        vec![QueueStep::Started],
        vec![StatusStep::Finished(
            BuildResult::Failure,
            Duration::from_secs(3),
        )],
    ));
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = orchestrator(&ci, &notifier, fast_config())
        .run(&build_run("deploy"))
        .await
        .expect("run");

    assert!(matches!(
        outcome,
        BuildRunOutcome::Completed {
            result: BuildResult::Failure,
            ..
        }
    ));
    let messages = notifier.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(
        messages[2].attachments[0].color.as_deref(),
        Some("#d50200")
    );
    assert_eq!(
        messages[3].text.as_deref(),
        Some("Started by bot\nFinished: FAILURE\n")
    );
    assert_eq!(messages[3].mrkdwn, Some(false));
    assert_eq!(ci.counts().3, 1);
}

#[tokio::test]
async fn regression_unknown_job_sends_one_private_not_found_message() {
    let ci = Arc::new(FakeCi::new(vec![QueueStep::Started], vec![StatusStep::Running]));
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = orchestrator(&ci, &notifier, fast_config())
        .run(&build_run("ghost"))
        .await
        .expect("run");

    assert_eq!(outcome, BuildRunOutcome::NotFound);
    let private = notifier
        .messages()
        .into_iter()
        .filter(SlackMessage::is_private)
        .collect::<Vec<_>>();
    assert_eq!(private.len(), 1);
    assert_eq!(private[0].text.as_deref(), Some("Job ghost not found."));
    assert_eq!(notifier.messages().len(), 2);
    assert_eq!(ci.counts(), (0, 0, 0, 0));
}

#[tokio::test]
async fn regression_running_build_past_deadline_times_out_silently() {
    let ci = Arc::new(FakeCi::new(vec![QueueStep::Started], vec![StatusStep::Running]));
    let notifier = Arc::new(RecordingNotifier::default());
    let config = BuildOrchestratorConfig {
        poll_interval: Duration::from_millis(5),
        response_timeout: Duration::from_millis(40),
    };

    let outcome = orchestrator(&ci, &notifier, config)
        .run(&build_run("deploy"))
        .await
        .expect("run");

    assert_eq!(outcome, BuildRunOutcome::TimedOut);
    assert_eq!(
        notifier.titles(),
        vec![
            "alice requested build of deploy".to_string(),
            "Started building deploy".to_string(),
        ]
    );
    assert!(ci.counts().2 >= 1);
}

#[tokio::test]
async fn regression_queued_build_past_deadline_times_out() {
    let ci = Arc::new(FakeCi::new(vec![QueueStep::Waiting], vec![StatusStep::Running]));
    let notifier = Arc::new(RecordingNotifier::default());
    let config = BuildOrchestratorConfig {
        poll_interval: Duration::from_millis(5),
        response_timeout: Duration::from_millis(30),
    };

    let outcome = orchestrator(&ci, &notifier, config)
        .run(&build_run("deploy"))
        .await
        .expect("run");

    assert_eq!(outcome, BuildRunOutcome::TimedOut);
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(ci.counts().2, 0);
}

#[tokio::test]
async fn integration_transient_poll_failures_are_retried() {
    let ci = Arc::new(FakeCi::new(
        vec![QueueStep::TransportError, QueueStep::Started],
        vec![
            StatusStep::TransportError,
            StatusStep::Finished(BuildResult::Unstable, Duration::from_secs(7)),
        ],
    ));
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = orchestrator(&ci, &notifier, fast_config())
        .run(&build_run("deploy"))
        .await
        .expect("run");

    assert!(matches!(
        outcome,
        BuildRunOutcome::Completed {
            result: BuildResult::Unstable,
            ..
        }
    ));
    let titles = notifier.titles();
    assert_eq!(titles[2], "Built deploy, result was a UNSTABLE");
    let (_, resolve_calls, refresh_calls, _) = ci.counts();
    assert_eq!(resolve_calls, 2);
    assert_eq!(refresh_calls, 2);
}

#[tokio::test]
async fn regression_cancelled_queue_item_ends_run_with_error() {
    let ci = Arc::new(FakeCi::new(vec![QueueStep::Cancelled], vec![StatusStep::Running]));
    let notifier = Arc::new(RecordingNotifier::default());

    let error = orchestrator(&ci, &notifier, fast_config())
        .run(&build_run("deploy"))
        .await
        .expect_err("cancelled");

    assert!(format!("{error:#}").contains("cancelled"));
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn unit_step_moves_requested_to_queued_with_eta() {
    let ci = Arc::new(FakeCi::new(vec![QueueStep::Started], vec![StatusStep::Running]));
    let notifier = Arc::new(RecordingNotifier::default());
    let orchestrator = orchestrator(&ci, &notifier, fast_config());
    let run = build_run("deploy");

    let phase = orchestrator
        .step(&run, BuildPhase::Requested)
        .await
        .expect("step");

    assert_eq!(
        phase,
        BuildPhase::Queued {
            queue_item: QueueItemHandle::new(format!("{SERVER_URL}/queue/item/7/")),
            eta: Some(TimeDelta::seconds(120)),
        }
    );
    let unchanged = orchestrator
        .step(&run, BuildPhase::NotFound)
        .await
        .expect("terminal step");
    assert_eq!(unchanged, BuildPhase::NotFound);
    assert_eq!(notifier.messages().len(), 1);
}
