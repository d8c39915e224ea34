use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Persisted dataset document read at crawl start and rewritten at the end.
    pub data_path: PathBuf,
    pub sources_path: PathBuf,
    pub scraper_user_agent: String,
    pub scraper_request_timeout_secs: u64,
    /// Additional attempts after the first for a retryable fetch.
    pub scraper_max_retries: u32,
    /// Base delay for exponential backoff: `base * 2^(attempt - 1)`.
    pub scraper_retry_backoff_base_ms: u64,
    pub scraper_retry_http_codes: Vec<u16>,
    /// Pacing for domains with no `delay_ms` in the sources file.
    pub scraper_default_delay_ms: u64,
    pub scraper_max_concurrent_requests: usize,
    pub scraper_max_concurrent_per_domain: usize,
    /// Crawl-level error count at which the run is aborted.
    pub scraper_max_errors: usize,
    pub scraper_obey_robots: bool,
}
