use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Directory site a source entry is scraped from. Selects the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    TheBash,
    Bark,
    GigSalad,
}

impl SourceKind {
    /// Short tag recorded in each canonical record's `source` field.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            SourceKind::TheBash => "thebash",
            SourceKind::Bark => "bark",
            SourceKind::GigSalad => "gigsalad",
        }
    }

    /// Prefix joined to the site-native id with `_` to build a record id.
    #[must_use]
    pub fn id_prefix(self) -> &'static str {
        match self {
            SourceKind::TheBash => "tb",
            SourceKind::Bark => "bark",
            SourceKind::GigSalad => "gs",
        }
    }

    /// Pacing used when the sources file does not set `delay_ms`.
    #[must_use]
    pub fn default_delay_ms(self) -> u64 {
        match self {
            SourceKind::TheBash => 3000,
            SourceKind::Bark => 2000,
            SourceKind::GigSalad => 2500,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thebash" => Ok(SourceKind::TheBash),
            "bark" => Ok(SourceKind::Bark),
            "gigsalad" => Ok(SourceKind::GigSalad),
            other => Err(ConfigError::Validation(format!(
                "unknown source tag '{other}'"
            ))),
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub tag: SourceKind,
    pub start_url: String,
    /// Minimum gap between two requests to this source's domain.
    pub delay_ms: Option<u64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl SourceConfig {
    #[must_use]
    pub fn effective_delay_ms(&self) -> u64 {
        self.delay_ms.unwrap_or_else(|| self.tag.default_delay_ms())
    }

    /// Host of `start_url`, used as the pacing key for this source.
    #[must_use]
    pub fn domain(&self) -> Option<String> {
        url::Url::parse(&self.start_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceConfig>,
}

impl SourcesFile {
    /// Iterates the entries with `enabled: true`.
    pub fn enabled(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

/// Load and validate the source list from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sources_file: SourcesFile = serde_yaml::from_str(&content)?;

    validate_sources(&sources_file)?;

    Ok(sources_file)
}

fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    if sources_file.sources.is_empty() {
        return Err(ConfigError::Validation(
            "at least one source must be configured".to_string(),
        ));
    }

    let mut seen_tags = HashSet::new();

    for source in &sources_file.sources {
        if !seen_tags.insert(source.tag) {
            return Err(ConfigError::Validation(format!(
                "duplicate source tag: '{}'",
                source.tag
            )));
        }

        let url = url::Url::parse(&source.start_url).map_err(|e| {
            ConfigError::Validation(format!(
                "source '{}' has invalid start_url '{}': {e}",
                source.tag, source.start_url
            ))
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::Validation(format!(
                "source '{}' start_url must be an http(s) URL with a host",
                source.tag
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "sources_test.rs"]
mod tests;
