//! Build orchestration for slash-command requests.
//!
//! A `BuildOrchestrator` drives one request from trigger to completion as an
//! explicit phase machine, reporting each transition through a `Notifier`.
//! `DetachedRunner` hides how independent runs are scheduled.

pub mod build_orchestrator;
pub mod command_request;
pub mod detached_runner;

#[cfg(test)]
mod tests;

pub use build_orchestrator::{
    remaining_eta, BuildOrchestrator, BuildOrchestratorConfig, BuildPhase, BuildRun,
    BuildRunOutcome,
};
pub use command_request::CommandRequest;
pub use detached_runner::{DetachedRunner, DetachedTask, TokioDetachedRunner};
