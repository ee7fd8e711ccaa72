//! Bridge server bootstrap and router wiring.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use sjr_jenkins::CiBackend;
use sjr_orchestrator::{BuildOrchestrator, DetachedRunner};
use sjr_slack::ParamNameCase;
use tokio::net::TcpListener;

use crate::slash_command_handlers::{handle_health, handle_slash_command};

pub const HEALTH_ENDPOINT: &str = "/";
pub const SLASH_COMMAND_ENDPOINT: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeServerConfig {
    pub bind: String,
}

/// Shared, read-only state behind every request.
pub struct BridgeServerState {
    pub slack_token: String,
    pub param_case: ParamNameCase,
    pub ci: Arc<dyn CiBackend>,
    pub orchestrator: BuildOrchestrator,
    pub runner: Arc<dyn DetachedRunner>,
}

pub fn build_bridge_router(state: Arc<BridgeServerState>) -> Router {
    Router::new()
        .route(HEALTH_ENDPOINT, get(handle_health).post(handle_slash_command))
        .with_state(state)
}

/// Serves slash commands on `config.bind` until ctrl-c.
pub async fn run_bridge_server(config: BridgeServerConfig, state: BridgeServerState) -> Result<()> {
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", config.bind))?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind bridge server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound bridge server address")?;

    tracing::info!(
        addr = %local_addr,
        endpoint = SLASH_COMMAND_ENDPOINT,
        jenkins = state.ci.server_url(),
        "slash command bridge listening"
    );

    let app = build_bridge_router(Arc::new(state));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("bridge server exited unexpectedly")?;

    tracing::info!("slash command bridge stopped");
    Ok(())
}
