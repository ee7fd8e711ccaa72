//! Configuration surface and startup wiring for the `sjr` slash-command bridge.

mod bootstrap_helpers;
mod cli_args;
mod cli_validation;
mod startup;

pub use bootstrap_helpers::{init_tracing, tracing_default_level};
pub use cli_args::Cli;
pub use cli_validation::validate_cli;
pub use startup::{build_bridge_state, jenkins_client_config, orchestrator_config, run_cli};
