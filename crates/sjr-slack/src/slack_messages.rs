//! Slack message payloads for help, acknowledgement and build lifecycle events.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::TimeDelta;
use serde::Serialize;

use crate::slack_render_helpers::{
    format_eta, format_params, format_std_duration, truncate_console_for_slack,
    SLACK_TEXT_MAX_CHARS,
};

const SUCCESS_COLOR: &str = "#36a64f";
const FAILURE_COLOR: &str = "#d50200";
const MRKDWN_TEXT: &str = "text";

/// Slack visibility for a `response_url` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Only the requesting user sees the message.
    Ephemeral,
    /// The whole channel sees the message.
    InChannel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackAttachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    pub text: String,
    pub mrkdwn_in: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackMessage {
    pub response_type: ResponseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<SlackAttachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrkdwn: Option<bool>,
}

impl SlackMessage {
    pub fn is_private(&self) -> bool {
        self.response_type == ResponseType::Ephemeral
    }
}

/// Request details repeated in every lifecycle notification.
#[derive(Debug, Clone, Copy)]
pub struct BuildNotice<'a> {
    pub job_name: &'a str,
    pub params: &'a BTreeMap<String, String>,
    pub requester: &'a str,
    pub server_url: &'a str,
}

/// Finished-build facts rendered by `build_completed_messages`.
#[derive(Debug, Clone, Copy)]
pub struct CompletedBuildSummary<'a> {
    pub succeeded: bool,
    pub result_label: &'a str,
    pub result_url: &'a str,
    pub elapsed: Duration,
}

fn lifecycle_message(color: &str, title: String, title_link: &str, text: String) -> SlackMessage {
    SlackMessage {
        response_type: ResponseType::InChannel,
        text: None,
        attachments: vec![SlackAttachment {
            color: Some(color.to_string()),
            title: Some(title),
            title_link: Some(title_link.to_string()),
            text,
            mrkdwn_in: vec![MRKDWN_TEXT.to_string()],
        }],
        mrkdwn: None,
    }
}

pub fn build_requested_message(notice: BuildNotice<'_>) -> SlackMessage {
    lifecycle_message(
        SUCCESS_COLOR,
        format!(
            "{} requested build of {}",
            notice.requester, notice.job_name
        ),
        notice.server_url,
        format!(
            "Starting to build {} ({}).",
            notice.job_name,
            format_params(notice.params)
        ),
    )
}

pub fn build_started_message(notice: BuildNotice<'_>, eta: Option<TimeDelta>) -> SlackMessage {
    lifecycle_message(
        SUCCESS_COLOR,
        format!("Started building {}", notice.job_name),
        notice.server_url,
        format!(
            "Jenkins is now building {} ({}). ETA in {}",
            notice.job_name,
            format_params(notice.params),
            format_eta(eta)
        ),
    )
}

/// Renders the completion notice, followed by the raw console output when the
/// build did not succeed.
pub fn build_completed_messages(
    notice: BuildNotice<'_>,
    summary: CompletedBuildSummary<'_>,
    console: Option<&str>,
) -> Vec<SlackMessage> {
    let color = if summary.succeeded {
        SUCCESS_COLOR
    } else {
        FAILURE_COLOR
    };
    let mut messages = vec![lifecycle_message(
        color,
        format!(
            "Built {}, result was a {}",
            notice.job_name, summary.result_label
        ),
        summary.result_url,
        format!(
            "Jenkins built {} ({}) in {}",
            notice.job_name,
            format_params(notice.params),
            format_std_duration(summary.elapsed)
        ),
    )];
    if !summary.succeeded {
        if let Some(console) = console {
            messages.push(console_output_message(console));
        }
    }
    messages
}

fn console_output_message(console: &str) -> SlackMessage {
    SlackMessage {
        response_type: ResponseType::InChannel,
        text: Some(truncate_console_for_slack(console, SLACK_TEXT_MAX_CHARS)),
        attachments: Vec::new(),
        mrkdwn: Some(false),
    }
}

pub fn job_not_found_message(job_name: &str) -> SlackMessage {
    SlackMessage {
        response_type: ResponseType::Ephemeral,
        text: Some(format!("Job {job_name} not found.")),
        attachments: Vec::new(),
        mrkdwn: None,
    }
}

/// Usage text for `command`; `jobs` is `None` when the job list is unavailable.
pub fn help_message(command: &str, jobs: Option<&[String]>) -> SlackMessage {
    let mut help_text = [
        "Trigger Jenkins builds".to_string(),
        String::new(),
        format!("`{command} help` - Show this help"),
        format!("`{command} JOB` - Build _JOB_ on Jenkins"),
        format!(
            "`{command} JOB --PARAM=value` - Build _JOB_ on Jenkins passing PARAM=value argument"
        ),
        String::new(),
        "*Supported jobs*:".to_string(),
    ]
    .join("\n");
    help_text.push('\n');
    match jobs {
        Some(jobs) => {
            for job in jobs {
                help_text.push_str(&format!(" - `{job}`\n"));
            }
        }
        None => help_text.push_str("_The job list is unavailable right now._\n"),
    }

    SlackMessage {
        response_type: ResponseType::Ephemeral,
        text: Some(format!("How to use {command}")),
        attachments: vec![SlackAttachment {
            color: None,
            title: None,
            title_link: None,
            text: help_text,
            mrkdwn_in: vec![MRKDWN_TEXT.to_string()],
        }],
        mrkdwn: None,
    }
}

/// Synchronous reply returned to Slack before the build runs.
pub fn ack_text(job_name: &str) -> String {
    format!("Gotcha, trying to build {job_name}.")
}
