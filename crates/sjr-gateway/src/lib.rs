//! HTTP entry point for Slack slash commands.
//!
//! Validates inbound command posts, answers help requests inline, and hands
//! build requests to the orchestrator on a detached task.

mod bridge_server;
mod slash_command_handlers;
mod types;


pub use bridge_server::{
    build_bridge_router, run_bridge_server, BridgeServerConfig, BridgeServerState,
    HEALTH_ENDPOINT, SLASH_COMMAND_ENDPOINT,
};
pub use types::{BridgeApiError, SlashCommandForm};
