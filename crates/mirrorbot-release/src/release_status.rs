//! Release status and pull-spec lookups against the release-controller API.
//!
//! A release may be published under any of several stream paths. Each lookup
//! queries the configured streams in order and keeps the first response that
//! decodes; failures on earlier streams are logged and skipped, and data from
//! different streams is never merged.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::ReleaseLookupError;

/// Stream paths queried by default, in order.
pub const DEFAULT_STATUS_STREAMS: [&str; 2] = ["4-dev-preview", "4-stable"];

const KUBERNETES_COMPONENT: &str = "Kubernetes";
const RHCOS_COMPONENT: &str = "Red Hat Enterprise Linux CoreOS";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Build and test summary for one release, taken from a single stream.
pub struct ReleaseStatus {
    pub phase: String,
    /// Raw creation timestamp; parsed only when the report is rendered.
    pub created_at: Option<String>,
    pub kubernetes_version: Option<String>,
    pub rhcos_version: Option<String>,
    pub rhcos_from: Option<String>,
    pub succeeded_job_count: usize,
    pub failed_job_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseDetail {
    pub pull_spec: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseStatusApiResponse {
    #[serde(default)]
    phase: Option<String>,
    #[serde(default)]
    change_log_json: Option<ChangeLogJson>,
    #[serde(default)]
    results: Option<ReleaseResults>,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeLogJson {
    #[serde(default)]
    to: Option<ChangeLogTarget>,
    #[serde(default)]
    components: Option<Vec<ChangeLogComponent>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeLogTarget {
    #[serde(default)]
    created: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeLogComponent {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    from: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseResults {
    #[serde(default)]
    informing_jobs: Option<HashMap<String, JobResult>>,
}

#[derive(Debug, Default, Deserialize)]
struct JobResult {
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseDetailApiResponse {
    #[serde(default)]
    pull_spec: Option<String>,
}

#[derive(Debug, Error)]
enum StreamFailure {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("status {0}")]
    Status(u16),
    #[error("invalid json: {0}")]
    Decode(#[source] reqwest::Error),
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

impl From<ReleaseStatusApiResponse> for ReleaseStatus {
    fn from(response: ReleaseStatusApiResponse) -> Self {
        let change_log = response.change_log_json.unwrap_or_default();
        let mut status = ReleaseStatus {
            phase: response.phase.unwrap_or_default(),
            created_at: non_empty(change_log.to.and_then(|to| to.created)),
            ..ReleaseStatus::default()
        };

        for component in change_log.components.unwrap_or_default() {
            match component.name.as_deref() {
                Some(KUBERNETES_COMPONENT) => {
                    status.kubernetes_version = non_empty(component.version);
                }
                Some(RHCOS_COMPONENT) => {
                    status.rhcos_version = non_empty(component.version);
                    status.rhcos_from = non_empty(component.from);
                }
                _ => {}
            }
        }

        let jobs = response
            .results
            .and_then(|results| results.informing_jobs)
            .unwrap_or_default();
        for job in jobs.values() {
            match job.state.as_deref() {
                Some("Succeeded") => status.succeeded_job_count += 1,
                Some("Failed") => status.failed_job_count += 1,
                _ => {}
            }
        }
        status
    }
}

#[derive(Clone)]
/// Resolves release status and detail by probing the configured streams.
pub struct ReleaseStatusClient {
    http: reqwest::Client,
    status_base: String,
    streams: Vec<String>,
}

impl ReleaseStatusClient {
    pub fn new(http: reqwest::Client, status_base: &str, streams: Vec<String>) -> Self {
        Self {
            http,
            status_base: status_base.trim().trim_end_matches('/').to_string(),
            streams,
        }
    }

    pub fn release_api_url(&self, stream: &str, version: &str) -> String {
        format!(
            "{}/api/v1/releasestream/{stream}/release/{version}",
            self.status_base
        )
    }

    pub async fn fetch_release_status(
        &self,
        version: &str,
    ) -> Result<ReleaseStatus, ReleaseLookupError> {
        self.first_answering_stream::<ReleaseStatusApiResponse>(version)
            .await
            .map(ReleaseStatus::from)
            .ok_or_else(|| ReleaseLookupError::StatusNotFound {
                version: version.to_string(),
                streams: self.streams.clone(),
            })
    }

    pub async fn fetch_release_detail(
        &self,
        version: &str,
    ) -> Result<ReleaseDetail, ReleaseLookupError> {
        self.first_answering_stream::<ReleaseDetailApiResponse>(version)
            .await
            .map(|response| ReleaseDetail {
                pull_spec: non_empty(response.pull_spec),
            })
            .ok_or_else(|| ReleaseLookupError::DetailNotFound {
                version: version.to_string(),
                streams: self.streams.clone(),
            })
    }

    async fn first_answering_stream<T>(&self, version: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        for stream in &self.streams {
            let url = self.release_api_url(stream, version);
            match self.fetch_json::<T>(&url).await {
                Ok(parsed) => {
                    debug!(version, stream = stream.as_str(), "release stream answered");
                    return Some(parsed);
                }
                Err(failure) => {
                    debug!(
                        version,
                        stream = stream.as_str(),
                        %url,
                        error = %failure,
                        "release stream lookup failed; trying next stream"
                    );
                }
            }
        }
        None
    }

    async fn fetch_json<T>(&self, url: &str) -> Result<T, StreamFailure>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(StreamFailure::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(StreamFailure::Status(status.as_u16()));
        }
        // A `null` body or trailing bytes after the object fail to decode, so
        // that stream counts as not answering.
        response.json::<T>().await.map_err(StreamFailure::Decode)
    }
}
