//! Mirror index scanning and latest-release selection.

use regex::Regex;
use tracing::{debug, warn};

use crate::ReleaseLookupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Enumerates the mirror folders that publish release directories.
pub enum MirrorFolder {
    Primary,
    DevPreview,
}

impl MirrorFolder {
    /// Folders in the order they are fetched.
    pub const ALL: [MirrorFolder; 2] = [MirrorFolder::Primary, MirrorFolder::DevPreview];

    pub fn as_str(self) -> &'static str {
        match self {
            MirrorFolder::Primary => "ocp",
            MirrorFolder::DevPreview => "ocp-dev-preview",
        }
    }

    /// Release stream used by the human-facing release page for this folder.
    pub fn release_stream(self) -> &'static str {
        match self {
            MirrorFolder::Primary => "4-stable",
            MirrorFolder::DevPreview => "4-dev-preview",
        }
    }
}

impl std::fmt::Display for MirrorFolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One version-matching release directory discovered on a mirror index page.
pub struct ReleaseCandidate {
    pub version: String,
    pub source_stream: MirrorFolder,
    pub index_url: String,
}

/// Builds the anchor pattern for release directories starting with `version`.
///
/// The version is escaped, so `4.20` only matches a literal dot.
pub fn release_folder_pattern(version: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r#"href="({}[^"]+)/""#, regex::escape(version)))
}

/// Extracts every release directory referenced by `body`, in document order.
pub fn scan_mirror_index(
    pattern: &Regex,
    body: &str,
    folder: MirrorFolder,
    folder_url: &str,
) -> Vec<ReleaseCandidate> {
    pattern
        .captures_iter(body)
        .filter_map(|captures| captures.get(1))
        .map(|name| ReleaseCandidate {
            version: name.as_str().to_string(),
            source_stream: folder,
            index_url: format!("{folder_url}{}/", name.as_str()),
        })
        .collect()
}

/// Orders candidates newest first by descending byte-wise version string.
///
/// Nightly names share a fixed-width date suffix, which is what makes the
/// lexicographic order meaningful. The sort is stable, so equal versions keep
/// primary-folder entries first.
pub fn sort_candidates_latest_first(candidates: &mut [ReleaseCandidate]) {
    candidates.sort_by(|left, right| right.version.cmp(&left.version));
}

/// Picks the newest candidate, failing when nothing matched `version`.
pub fn select_latest_release(
    version: &str,
    mut candidates: Vec<ReleaseCandidate>,
) -> Result<ReleaseCandidate, ReleaseLookupError> {
    sort_candidates_latest_first(&mut candidates);
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| ReleaseLookupError::NoReleases {
            version: version.to_string(),
        })
}

#[derive(Clone)]
/// Lists release directories from the primary and dev-preview mirror folders.
pub struct MirrorIndexClient {
    http: reqwest::Client,
    mirror_base: String,
}

impl MirrorIndexClient {
    pub fn new(http: reqwest::Client, mirror_base: &str) -> Self {
        Self {
            http,
            mirror_base: format!("{}/", mirror_base.trim().trim_end_matches('/')),
        }
    }

    pub fn folder_url(&self, folder: MirrorFolder) -> String {
        format!("{}{}/", self.mirror_base, folder.as_str())
    }

    /// Fetches both folder indexes and returns every match, primary folder first.
    ///
    /// A transport or body-read failure on either folder aborts the listing.
    /// A folder answering with a non-success status contributes no candidates.
    pub async fn list_releases(
        &self,
        version: &str,
    ) -> Result<Vec<ReleaseCandidate>, ReleaseLookupError> {
        let pattern = release_folder_pattern(version)?;
        let mut releases = Vec::new();
        for folder in MirrorFolder::ALL {
            let url = self.folder_url(folder);
            let Some(body) = self.fetch_index(&url).await? else {
                continue;
            };
            let found = scan_mirror_index(&pattern, &body, folder, &url);
            debug!(
                version,
                folder = folder.as_str(),
                matches = found.len(),
                "scanned mirror index"
            );
            releases.extend(found);
        }
        Ok(releases)
    }

    async fn fetch_index(&self, url: &str) -> Result<Option<String>, ReleaseLookupError> {
        let response =
            self.http
                .get(url)
                .send()
                .await
                .map_err(|source| ReleaseLookupError::Fetch {
                    url: url.to_string(),
                    source,
                })?;
        let status = response.status();
        if !status.is_success() {
            warn!(
                %url,
                status = status.as_u16(),
                "mirror index returned non-success status; skipping folder"
            );
            return Ok(None);
        }
        response
            .text()
            .await
            .map(Some)
            .map_err(|source| ReleaseLookupError::ReadBody {
                url: url.to_string(),
                source,
            })
    }
}
