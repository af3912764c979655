//! Message-to-reply orchestration over the lookup components.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    extract_version_token, render_release_report, select_latest_release, MirrorIndexClient,
    ReleaseLookupConfig, ReleaseLookupError, ReleaseReport, ReleaseStatusClient,
    RELEASE_LOOKUP_USER_AGENT,
};

#[derive(Clone)]
/// Resolves the newest release for a version and renders the chat reply.
pub struct ReleaseLookup {
    config: ReleaseLookupConfig,
    mirror: MirrorIndexClient,
    status: ReleaseStatusClient,
}

impl ReleaseLookup {
    pub fn new(config: ReleaseLookupConfig) -> Result<Self, ReleaseLookupError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .user_agent(RELEASE_LOOKUP_USER_AGENT)
            .build()
            .map_err(ReleaseLookupError::HttpClient)?;
        let mirror = MirrorIndexClient::new(http.clone(), &config.mirror_base_url);
        let status = ReleaseStatusClient::new(
            http,
            &config.release_status_base_url,
            config.status_streams.clone(),
        );
        Ok(Self {
            config,
            mirror,
            status,
        })
    }

    pub fn config(&self) -> &ReleaseLookupConfig {
        &self.config
    }

    pub fn extract_version<'a>(&self, text: &'a str) -> Option<&'a str> {
        extract_version_token(text, &self.config.version_prefix)
    }

    /// Lists, selects, and enriches the latest release for `version`.
    ///
    /// Status and detail are best-effort: either may be missing from the
    /// returned report while the other is present.
    pub async fn resolve(&self, version: &str) -> Result<ReleaseReport, ReleaseLookupError> {
        let candidates = self.mirror.list_releases(version).await?;
        let release = select_latest_release(version, candidates)?;
        info!(
            version,
            release = release.version.as_str(),
            folder = release.source_stream.as_str(),
            "resolved latest release"
        );

        let (status, detail) = tokio::join!(
            self.status.fetch_release_status(&release.version),
            self.status.fetch_release_detail(&release.version),
        );
        let status = status
            .inspect_err(|error| {
                warn!(release = release.version.as_str(), %error, "release status unavailable")
            })
            .ok();
        let detail = detail
            .inspect_err(|error| {
                warn!(release = release.version.as_str(), %error, "release pull spec unavailable")
            })
            .ok();

        Ok(ReleaseReport {
            requested_version: version.to_string(),
            release,
            status,
            detail,
        })
    }

    /// Builds the reply for `version`, turning lookup failures into plain text.
    pub async fn reply_for_version(&self, version: &str, now: DateTime<Utc>) -> String {
        match self.resolve(version).await {
            Ok(report) => {
                render_release_report(&report, &self.config.release_status_base_url, now)
            }
            Err(ReleaseLookupError::NoReleases { .. }) => {
                format!("No releases found for {version}")
            }
            Err(error) => {
                warn!(version, %error, "release listing failed");
                format!("Error fetching releases for {version}: {error}")
            }
        }
    }

    /// Returns `None` when `text` carries no version token.
    pub async fn reply_for_message(&self, text: &str, now: DateTime<Utc>) -> Option<String> {
        let version = self.extract_version(text)?;
        Some(self.reply_for_version(version, now).await)
    }
}
