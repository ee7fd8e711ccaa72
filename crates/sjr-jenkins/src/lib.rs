//! CI client crate for the Slack build bridge.
//!
//! Defines the backend-neutral `CiBackend` contract used by the orchestrator
//! and its Jenkins JSON API implementation, including the cached job list and
//! retrying transport helpers.

pub mod ci_backend;
pub mod jenkins_api_client;
pub mod jenkins_transport_helpers;


pub use ci_backend::{
    BuildHandle, BuildResult, BuildStatus, CiBackend, CiError, QueueItemHandle, TriggeredBuild,
};
pub use jenkins_api_client::{JenkinsApiClient, JenkinsClientConfig};
