//! Slack-ready rendering of a resolved release.

use chrono::{DateTime, Utc};

use crate::{ReleaseCandidate, ReleaseDetail, ReleaseStatus};

pub const KUBERNETES_RELEASES_URL: &str = "https://kubernetes.io/releases/";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Everything known about the latest release for one requested version.
pub struct ReleaseReport {
    pub requested_version: String,
    pub release: ReleaseCandidate,
    pub status: Option<ReleaseStatus>,
    pub detail: Option<ReleaseDetail>,
}

/// Whole days elapsed between an RFC 3339 timestamp and `now`, truncated toward zero.
pub fn days_since(created_at: &str, now: DateTime<Utc>) -> Option<i64> {
    let created = DateTime::parse_from_rfc3339(created_at).ok()?;
    Some(
        now.signed_duration_since(created.with_timezone(&Utc))
            .num_days(),
    )
}

/// Link to the Kubernetes release notes for the `major.minor` of `version`.
pub fn kubernetes_release_link(version: &str) -> Option<String> {
    let mut parts = version.splitn(3, '.');
    let major = parts.next()?;
    let minor = parts.next()?;
    Some(format!("{KUBERNETES_RELEASES_URL}#release-v{major}-{minor}"))
}

pub fn release_page_url(release_page_base: &str, stream: &str, version: &str) -> String {
    format!(
        "{}/releasestream/{stream}/release/{version}",
        release_page_base.trim_end_matches('/')
    )
}

pub fn install_command(pull_spec: &str) -> String {
    format!("oc adm release extract --command=oc --from={pull_spec}")
}

/// Wraps text in the blockquote and code-block decoration used for reports.
pub fn wrap_for_slack(message: &str) -> String {
    format!(">```{message}```")
}

/// Renders the fixed-order report. `now` only affects the "days ago" figure.
pub fn render_release_report(
    report: &ReleaseReport,
    release_page_base: &str,
    now: DateTime<Utc>,
) -> String {
    let release = &report.release;
    let mut lines = vec![
        format!(
            "Latest {} release in {}: {}",
            report.requested_version, release.source_stream, release.version
        ),
        format!("URL: {}", release.index_url),
    ];

    if let Some(status) = &report.status {
        if let Some(created_at) = status.created_at.as_deref() {
            match days_since(created_at, now) {
                Some(days) => lines.push(format!("Created: {days} days ago ({created_at})")),
                None => lines.push(format!("Created: {created_at}")),
            }
        }
        lines.push(format!(
            "Phase: {} ({} Pass / {} Fail)",
            status.phase, status.succeeded_job_count, status.failed_job_count
        ));
        if let Some(kubernetes_version) = status.kubernetes_version.as_deref() {
            match kubernetes_release_link(kubernetes_version) {
                Some(link) => lines.push(format!(
                    "Kubernetes Version: <{link}|{kubernetes_version}>"
                )),
                None => lines.push(format!("Kubernetes Version: {kubernetes_version}")),
            }
        }
        if let Some(rhcos_version) = status.rhcos_version.as_deref() {
            match status.rhcos_from.as_deref() {
                Some(from) => lines.push(format!("RHCOS Version: {rhcos_version} ({from})")),
                None => lines.push(format!("RHCOS Version: {rhcos_version}")),
            }
        }
        lines.push(format!(
            "Click <{}|here> for release info",
            release_page_url(
                release_page_base,
                release.source_stream.release_stream(),
                &release.version
            )
        ));
    }

    if let Some(pull_spec) = report
        .detail
        .as_ref()
        .and_then(|detail| detail.pull_spec.as_deref())
        .filter(|pull_spec| !pull_spec.is_empty())
    {
        lines.push(format!("Install: {}", install_command(pull_spec)));
    }

    wrap_for_slack(&lines.join("\n"))
}
