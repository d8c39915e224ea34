use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unexpected HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("{url} is disallowed by robots.txt")]
    RobotsDisallowed { url: String },

    #[error("extraction failed for {source_tag} page {url}: {reason}")]
    Extraction {
        source_tag: String,
        url: String,
        reason: String,
    },

    #[error("record {} rejected: missing required field `{field}`", id.as_deref().unwrap_or("<unknown>"))]
    Validation { id: Option<String>, field: &'static str },
}

impl ScraperError {
    pub(crate) fn extraction(
        source_tag: &str,
        url: &str,
        reason: impl Into<String>,
    ) -> Self {
        ScraperError::Extraction {
            source_tag: source_tag.to_owned(),
            url: url.to_owned(),
            reason: reason.into(),
        }
    }
}
