//! Jenkins JSON API client implementing the `CiBackend` contract.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use sjr_core::{current_unix_timestamp_ms, elapsed_since_unix_ms, TtlCache};

use crate::ci_backend::{
    BuildHandle, BuildResult, BuildStatus, CiBackend, CiError, QueueItemHandle, TriggeredBuild,
};
use crate::jenkins_transport_helpers::{
    is_retryable_jenkins_status, is_retryable_transport_error, parse_retry_after,
    resource_api_url, retry_delay, truncate_for_error, RETRY_ATTEMPT_HEADER,
};

const JOB_LIST_TREE: &str = "jobs[name]";
const JOB_INFO_TREE: &str =
    "name,lastSuccessfulBuild[number,duration],property[parameterDefinitions[name]]";
const BUILD_STATUS_TREE: &str = "number,url,building,duration,result,timestamp";

/// Connection settings for `JenkinsApiClient`.
#[derive(Clone)]
pub struct JenkinsClientConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub job_cache_ttl: Duration,
}

#[derive(Debug, Deserialize)]
struct JenkinsJobList {
    #[serde(default)]
    jobs: Vec<JenkinsJobName>,
}

#[derive(Debug, Deserialize)]
struct JenkinsJobName {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JenkinsJobInfo {
    #[serde(default)]
    last_successful_build: Option<JenkinsBuildSummary>,
    #[serde(default)]
    property: Vec<JenkinsJobProperty>,
}

impl JenkinsJobInfo {
    /// Parameterized jobs only accept `buildWithParameters`; the rest only `build`.
    fn is_parameterized(&self) -> bool {
        self.property
            .iter()
            .any(|property| !property.parameter_definitions.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JenkinsJobProperty {
    #[serde(default)]
    parameter_definitions: Vec<IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct JenkinsBuildSummary {
    #[serde(default)]
    duration: u64,
}

#[derive(Debug, Deserialize)]
struct JenkinsQueueItem {
    #[serde(default)]
    cancelled: bool,
    #[serde(default)]
    executable: Option<JenkinsQueueExecutable>,
}

#[derive(Debug, Deserialize)]
struct JenkinsQueueExecutable {
    number: u64,
    url: String,
}

#[derive(Debug, Deserialize)]
struct JenkinsBuildDetail {
    number: u64,
    url: String,
    #[serde(default)]
    building: bool,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    timestamp: u64,
}

impl JenkinsBuildDetail {
    fn status(&self, now_unix_ms: u64) -> BuildStatus {
        let elapsed = if self.building {
            elapsed_since_unix_ms(self.timestamp, now_unix_ms)
        } else {
            Duration::from_millis(self.duration)
        };
        BuildStatus {
            building: self.building,
            elapsed,
            result: self.result.as_deref().map(BuildResult::from_jenkins),
        }
    }
}

pub struct JenkinsApiClient {
    http: reqwest::Client,
    base_url: Url,
    server_url: String,
    username: Option<String>,
    password: Option<String>,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
    job_cache: TtlCache<Vec<String>>,
}

impl JenkinsApiClient {
    pub fn new(config: JenkinsClientConfig) -> Result<Self> {
        let server_url = config.base_url.trim().trim_end_matches('/').to_string();
        let base_url = Url::parse(&format!("{server_url}/"))
            .with_context(|| format!("invalid jenkins url '{}'", config.base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("jenkins url '{}' cannot be used as a base", config.base_url);
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("sjr-jenkins-bridge"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to create jenkins api client")?;

        Ok(Self {
            http,
            base_url,
            server_url,
            username: config
                .username
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            password: config.password,
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
            job_cache: TtlCache::with_max_age(config.job_cache_ttl),
        })
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.username.as_deref() {
            Some(username) => request.basic_auth(username, self.password.as_deref()),
            None => request,
        }
    }

    /// Builds `{base}/job/{a}/job/{b}/{suffix…}` for folder-qualified job names.
    fn job_url(&self, job_name: &str, suffix: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("jenkins url cannot be used as a base"))?;
            segments.pop_if_empty();
            for part in job_name.split('/').filter(|part| !part.is_empty()) {
                segments.push("job").push(part);
            }
            segments.extend(suffix);
        }
        Ok(url)
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("failed to build jenkins url for '{path}'"))
    }

    /// Single attempt: help replies are synchronous and must stay inside
    /// Slack's response window.
    async fn fetch_job_names(&self) -> Result<Vec<String>> {
        tracing::debug!("updating jenkins job list");
        let url = self.api_url("api/json")?;
        let listing: JenkinsJobList = self
            .get_json("list jobs", 1, || {
                self.http.get(url.clone()).query(&[("tree", JOB_LIST_TREE)])
            })
            .await?;
        let names = listing
            .jobs
            .into_iter()
            .map(|job| job.name)
            .collect::<Vec<_>>();
        for name in &names {
            tracing::debug!(job = %name, "found jenkins job");
        }
        tracing::debug!(count = names.len(), "jenkins job list refreshed");
        Ok(names)
    }

    async fn fetch_job_info(&self, job_name: &str) -> Result<Option<JenkinsJobInfo>, CiError> {
        let url = self.job_url(job_name, &["api", "json"])?;
        let response = self
            .send_idempotent("read job", self.retry_max_attempts, || {
                self.http.get(url.clone()).query(&[("tree", JOB_INFO_TREE)])
            })
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success("read job", response).await?;
        let info = response
            .json::<JenkinsJobInfo>()
            .await
            .context("failed to decode jenkins read job")?;
        Ok(Some(info))
    }

    async fn fetch_build_detail(&self, build_url: &str) -> Result<JenkinsBuildDetail> {
        let url = resource_api_url(build_url, "api/json");
        self.get_json("read build", self.retry_max_attempts, || {
            self.http
                .get(url.as_str())
                .query(&[("tree", BUILD_STATUS_TREE)])
        })
        .await
    }

    async fn get_json<T, F>(
        &self,
        operation: &str,
        max_attempts: usize,
        request_builder: F,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let response = self
            .send_idempotent(operation, max_attempts, request_builder)
            .await?;
        let response = ensure_success(operation, response).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode jenkins {operation}"))
    }

    /// Sends a read request, retrying rate limits, server errors and transport
    /// failures up to `max_attempts` times. Non-retryable responses are handed
    /// back for inspection.
    async fn send_idempotent<F>(
        &self,
        operation: &str,
        max_attempts: usize,
        mut request_builder: F,
    ) -> Result<reqwest::Response>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = self
                .with_auth(request_builder())
                .header(RETRY_ATTEMPT_HEADER, attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if attempt < max_attempts
                        && is_retryable_jenkins_status(status.as_u16())
                    {
                        let delay = retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            parse_retry_after(response.headers()),
                        );
                        tracing::debug!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            "retrying jenkins request"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(error) => {
                    if attempt < max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("jenkins api {operation} request failed"));
                }
            }
        }
    }
}

async fn ensure_success(operation: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!(
        "jenkins api {operation} failed with status {}: {}",
        status.as_u16(),
        truncate_for_error(&body, 800)
    );
}

#[async_trait]
impl CiBackend for JenkinsApiClient {
    fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn list_jobs(&self) -> Result<Arc<Vec<String>>, CiError> {
        let jobs = self
            .job_cache
            .get_or_refresh(|| self.fetch_job_names())
            .await?;
        Ok(jobs)
    }

    async fn trigger_build(
        &self,
        job_name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<TriggeredBuild, CiError> {
        tracing::debug!(job = job_name, "starting jenkins build");
        let Some(info) = self.fetch_job_info(job_name).await? else {
            return Err(CiError::JobNotFound {
                name: job_name.to_string(),
            });
        };
        let eta = info
            .last_successful_build
            .as_ref()
            .map(|build| Duration::from_millis(build.duration))
            .filter(|duration| !duration.is_zero());

        let request = if info.is_parameterized() {
            // Parameters the caller leaves out fall back to the job's defaults.
            self.http
                .post(self.job_url(job_name, &["buildWithParameters"])?)
                .form(params)
        } else {
            if !params.is_empty() {
                tracing::warn!(
                    job = job_name,
                    ignored = params.len(),
                    "job defines no parameters; triggering without them"
                );
            }
            self.http.post(self.job_url(job_name, &["build"])?)
        };
        let response = self
            .with_auth(request)
            .send()
            .await
            .context("jenkins api trigger build request failed")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CiError::JobNotFound {
                name: job_name.to_string(),
            });
        }
        let response = ensure_success("trigger build", response).await?;
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow!("jenkins trigger response for {job_name} had no queue location"))?;
        let queue_url = self
            .base_url
            .join(location)
            .with_context(|| format!("invalid jenkins queue location '{location}'"))?;

        tracing::debug!(job = job_name, queue = %queue_url, eta_ms = ?eta.map(|eta| eta.as_millis()), "jenkins build queued");
        Ok(TriggeredBuild {
            eta,
            queue_item: QueueItemHandle::new(queue_url.to_string()),
        })
    }

    async fn resolve_build(&self, queue_item: &QueueItemHandle) -> Result<BuildHandle, CiError> {
        let url = resource_api_url(queue_item.url(), "api/json");
        let item: JenkinsQueueItem = self
            .get_json("read queue item", self.retry_max_attempts, || {
                self.http.get(url.as_str())
            })
            .await?;
        if item.cancelled {
            return Err(CiError::QueueItemCancelled);
        }
        let Some(executable) = item.executable else {
            return Err(CiError::NotYetStarted);
        };
        let mut build = BuildHandle::new(
            executable.number,
            executable.url,
            BuildStatus {
                building: true,
                ..BuildStatus::default()
            },
        );
        self.refresh_status(&mut build).await?;
        Ok(build)
    }

    async fn refresh_status(&self, build: &mut BuildHandle) -> Result<(), CiError> {
        let detail = self.fetch_build_detail(build.url()).await?;
        if detail.number != build.number() {
            tracing::warn!(
                expected = build.number(),
                observed = detail.number,
                url = %detail.url,
                "jenkins returned a different build number"
            );
        }
        build.update_status(detail.status(current_unix_timestamp_ms()));
        Ok(())
    }

    async fn console_text(&self, build: &BuildHandle) -> Result<String, CiError> {
        let url = resource_api_url(build.url(), "consoleText");
        let response = self
            .send_idempotent("read console", self.retry_max_attempts, || {
                self.http.get(url.as_str())
            })
            .await?;
        let response = ensure_success("read console", response).await?;
        let text = response
            .text()
            .await
            .context("failed to read jenkins console text")?;
        Ok(text)
    }
}
