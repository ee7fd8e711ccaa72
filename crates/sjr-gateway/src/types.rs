//! Inbound form payload and HTTP-mapped validation errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use sjr_orchestrator::CommandRequest;

/// Rejection of an inbound command, returned before any side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeApiError {
    pub status: StatusCode,
    pub message: &'static str,
}

impl BridgeApiError {
    pub fn invalid_data() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid data",
        }
    }

    pub fn invalid_token() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Invalid token",
        }
    }
}

impl IntoResponse for BridgeApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Form fields Slack posts for a slash command. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct SlashCommandForm {
    pub token: Option<String>,
    pub command: Option<String>,
    pub text: Option<String>,
    pub user_name: Option<String>,
    pub channel_name: Option<String>,
    pub response_url: Option<String>,
}

impl SlashCommandForm {
    /// Fails when any field other than `text` is absent or empty.
    pub fn into_command_request(self) -> Result<CommandRequest, BridgeApiError> {
        fn required(value: Option<String>) -> Result<String, BridgeApiError> {
            value
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(BridgeApiError::invalid_data)
        }

        Ok(CommandRequest {
            token: required(self.token)?,
            command: required(self.command)?,
            text: self.text.unwrap_or_default(),
            user_name: required(self.user_name)?,
            channel_name: required(self.channel_name)?,
            response_url: required(self.response_url)?,
        })
    }
}
