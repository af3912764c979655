//! Release lookup pipeline for mirrorbot.
//!
//! Scans the OpenShift client mirror for release directories matching a
//! `major.minor` version, picks the newest one, enriches it with build status
//! and pull spec from the release-controller API, and renders the chat reply.

pub mod error;
pub mod lookup_runtime;
pub mod mirror_index;
pub mod release_status;
pub mod report;
pub mod version;

pub use error::ReleaseLookupError;
pub use lookup_runtime::ReleaseLookup;
pub use mirror_index::{
    release_folder_pattern, scan_mirror_index, select_latest_release,
    sort_candidates_latest_first, MirrorFolder, MirrorIndexClient, ReleaseCandidate,
};
pub use release_status::{
    ReleaseDetail, ReleaseStatus, ReleaseStatusClient, DEFAULT_STATUS_STREAMS,
};
pub use report::{
    days_since, install_command, kubernetes_release_link, release_page_url,
    render_release_report, wrap_for_slack, ReleaseReport, KUBERNETES_RELEASES_URL,
};
pub use version::extract_version_token;

pub const MIRROR_BASE_URL: &str = "https://mirror.openshift.com/pub/openshift-v4/clients/";
pub const RELEASE_STATUS_BASE_URL: &str =
    "https://openshift-release.apps.ci.l2s4.p1.openshiftapps.com";
pub const DEFAULT_VERSION_PREFIX: &str = "4.";
pub const RELEASE_LOOKUP_TIMEOUT_MS: u64 = 10_000;
pub const RELEASE_LOOKUP_USER_AGENT: &str = concat!("mirrorbot/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
/// Read-only settings shared by every lookup component.
pub struct ReleaseLookupConfig {
    pub mirror_base_url: String,
    /// Serves both the status API and the human-facing release pages.
    pub release_status_base_url: String,
    pub version_prefix: String,
    /// Stream paths queried in order by the status and detail lookups.
    pub status_streams: Vec<String>,
    pub request_timeout_ms: u64,
}

impl Default for ReleaseLookupConfig {
    fn default() -> Self {
        Self {
            mirror_base_url: MIRROR_BASE_URL.to_string(),
            release_status_base_url: RELEASE_STATUS_BASE_URL.to_string(),
            version_prefix: DEFAULT_VERSION_PREFIX.to_string(),
            status_streams: DEFAULT_STATUS_STREAMS
                .iter()
                .map(|stream| stream.to_string())
                .collect(),
            request_timeout_ms: RELEASE_LOOKUP_TIMEOUT_MS,
        }
    }
}
