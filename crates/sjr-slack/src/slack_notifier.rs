//! Delivery of lifecycle messages to a slash command's `response_url`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::slack_messages::SlackMessage;

const RESPONSE_BODY_LOG_CHARS: usize = 200;

/// Fire-and-forget sink for Slack messages.
///
/// Implementations log delivery failures themselves; callers never see them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, response_url: &str, message: &SlackMessage);
}

/// Posts JSON payloads to Slack `response_url` endpoints.
///
/// In test mode payloads are only logged.
#[derive(Clone)]
pub struct ResponseUrlNotifier {
    http: reqwest::Client,
    test_mode: bool,
}

impl ResponseUrlNotifier {
    pub fn new(request_timeout_ms: u64, test_mode: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack response client")?;
        Ok(Self { http, test_mode })
    }

    /// Sends one message and reports the outcome.
    pub async fn post_message(&self, response_url: &str, message: &SlackMessage) -> Result<()> {
        let payload =
            serde_json::to_string_pretty(message).context("failed to encode slack message")?;
        if self.test_mode {
            tracing::warn!(url = response_url, payload = %payload, "test mode: slack message not sent");
            return Ok(());
        }
        tracing::debug!(url = response_url, payload = %payload, "sending slack message");

        let response = self
            .http
            .post(response_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .context("slack response_url request failed")?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let body_preview = body.chars().take(RESPONSE_BODY_LOG_CHARS).collect::<String>();
        if !status.is_success() {
            bail!(
                "slack response_url rejected message with status {}: {}",
                status.as_u16(),
                body_preview
            );
        }
        tracing::info!(status = status.as_u16(), body = %body_preview, "slack accepted message");
        Ok(())
    }
}

#[async_trait]
impl Notifier for ResponseUrlNotifier {
    async fn notify(&self, response_url: &str, message: &SlackMessage) {
        if let Err(error) = self.post_message(response_url, message).await {
            tracing::warn!(url = response_url, error = %format!("{error:#}"), "slack notification delivery failed");
        }
    }
}
