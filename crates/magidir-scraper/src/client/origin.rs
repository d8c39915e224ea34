//! URL origin and domain extraction for pacing and robots lookups.

use crate::error::ScraperError;

/// Parsed pieces of a fetch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Target {
    /// Lower-cased host, the pacing and per-domain concurrency key.
    pub domain: String,
    /// `scheme://host[:port]`, the robots.txt cache key.
    pub origin: String,
}

/// Splits `url` into its pacing domain and robots origin.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] for unparseable, non-http(s), or
/// host-less URLs.
pub(super) fn parse_target(url: &str) -> Result<Target, ScraperError> {
    let parsed = url::Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: format!("unsupported scheme \"{}\"", parsed.scheme()),
        });
    }

    let domain = parsed
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: "URL has no host".to_owned(),
        })?;

    Ok(Target {
        domain,
        origin: parsed.origin().ascii_serialization(),
    })
}
