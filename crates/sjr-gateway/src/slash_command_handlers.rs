use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::FutureExt;
use sjr_orchestrator::BuildRun;
use sjr_slack::{ack_text, help_message, is_help_request, parse_build_command};
use tracing::Instrument;

use crate::bridge_server::BridgeServerState;
use crate::types::{BridgeApiError, SlashCommandForm};

const HEALTH_RESPONSE: &str = "All ok, mm'kay.";

pub(crate) async fn handle_health() -> &'static str {
    HEALTH_RESPONSE
}

pub(crate) async fn handle_slash_command(
    State(state): State<Arc<BridgeServerState>>,
    form: Result<Form<SlashCommandForm>, FormRejection>,
) -> Result<Response, BridgeApiError> {
    let Form(form) = form.map_err(|rejection| {
        tracing::warn!(error = %rejection, "rejected undecodable slash command");
        BridgeApiError::invalid_data()
    })?;
    let request = form.into_command_request().inspect_err(|_| {
        tracing::warn!("rejected slash command with missing fields");
    })?;
    if request.token != state.slack_token {
        tracing::warn!(
            user = %request.user_name,
            channel = %request.channel_name,
            "rejected slash command with invalid token"
        );
        return Err(BridgeApiError::invalid_token());
    }

    if is_help_request(&request.text) {
        return Ok(help_response(&state, &request.command).await);
    }
    let command = match parse_build_command(&request.text, state.param_case) {
        Ok(command) => command,
        Err(error) => {
            tracing::debug!(error = %error, text = %request.text, "malformed build command");
            return Ok(help_response(&state, &request.command).await);
        }
    };

    let reply = ack_text(&command.job_name);
    let span = tracing::info_span!(
        "build_run",
        job = %command.job_name,
        user = %request.user_name,
        channel = %request.channel_name
    );
    let label = format!("build {} for {}", command.job_name, request.user_name);
    let run = BuildRun::new(request, command);
    let orchestrator = state.orchestrator.clone();
    state.runner.run_detached(
        label,
        async move {
            let outcome = orchestrator.run(&run).await?;
            tracing::info!(?outcome, "build run finished");
            Ok::<(), anyhow::Error>(())
        }
        .instrument(span)
        .boxed(),
    );

    Ok(reply.into_response())
}

async fn help_response(state: &BridgeServerState, command: &str) -> Response {
    let jobs = match state.ci.list_jobs().await {
        Ok(jobs) => Some(jobs),
        Err(error) => {
            tracing::warn!(error = %format!("{error:#}"), "job list unavailable for help");
            None
        }
    };
    Json(help_message(command, jobs.as_ref().map(|jobs| jobs.as_slice()))).into_response()
}
