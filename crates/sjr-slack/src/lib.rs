//! Slack-facing helpers for the build bridge.
//!
//! This crate owns everything that speaks Slack: slash-command argument
//! parsing, human-readable duration/parameter rendering, the message payloads
//! sent for each build lifecycle event, and delivery to `response_url`.

pub mod slack_messages;
pub mod slack_notifier;
pub mod slack_render_helpers;
pub mod slash_command_parser;

pub use slack_messages::{
    ack_text, build_completed_messages, build_requested_message, build_started_message,
    help_message, job_not_found_message, BuildNotice, CompletedBuildSummary, ResponseType,
    SlackAttachment, SlackMessage,
};
pub use slack_notifier::{Notifier, ResponseUrlNotifier};
pub use slack_render_helpers::{
    format_duration, format_eta, format_params, format_std_duration, truncate_console_for_slack,
};
pub use slash_command_parser::{
    is_help_request, parse_build_command, CommandParseError, ParamNameCase,
    ParsedCommand,
};
