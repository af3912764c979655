use thiserror::Error;

#[derive(Debug, Error)]
/// Enumerates failures of the release lookup pipeline.
pub enum ReleaseLookupError {
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read body from {url}: {source}")]
    ReadBody {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid release folder pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("no releases found for {version}")]
    NoReleases { version: String },
    #[error("release status not found in {} for {version}", .streams.join(" or "))]
    StatusNotFound {
        version: String,
        streams: Vec<String>,
    },
    #[error("release detail not found in {} for {version}", .streams.join(" or "))]
    DetailNotFound {
        version: String,
        streams: Vec<String>,
    },
}
