use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str = "MagicianDirectory Bot (+https://example.com/bot)";
pub const DEFAULT_RETRY_HTTP_CODES: &str = "500,502,503,504,408,429";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let env = parse_environment(&or_default("MAGIDIR_ENV", "development"))?;
    let log_level = or_default("MAGIDIR_LOG_LEVEL", "info");
    let data_path = PathBuf::from(or_default("MAGIDIR_DATA_PATH", "./data/magicians.json"));
    let sources_path = PathBuf::from(or_default("MAGIDIR_SOURCES_PATH", "./config/sources.yaml"));

    let scraper_user_agent = or_default("MAGIDIR_SCRAPER_USER_AGENT", DEFAULT_USER_AGENT);
    let scraper_request_timeout_secs = parse_u64("MAGIDIR_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let scraper_max_retries = parse_u32("MAGIDIR_SCRAPER_MAX_RETRIES", "3")?;
    let scraper_retry_backoff_base_ms = parse_u64("MAGIDIR_SCRAPER_RETRY_BACKOFF_BASE_MS", "1000")?;
    let scraper_retry_http_codes = parse_status_list(
        "MAGIDIR_SCRAPER_RETRY_HTTP_CODES",
        &or_default("MAGIDIR_SCRAPER_RETRY_HTTP_CODES", DEFAULT_RETRY_HTTP_CODES),
    )?;
    let scraper_default_delay_ms = parse_u64("MAGIDIR_SCRAPER_DEFAULT_DELAY_MS", "2000")?;
    let scraper_max_concurrent_requests =
        parse_usize("MAGIDIR_SCRAPER_MAX_CONCURRENT_REQUESTS", "16")?;
    let scraper_max_concurrent_per_domain =
        parse_usize("MAGIDIR_SCRAPER_MAX_CONCURRENT_PER_DOMAIN", "4")?;
    let scraper_max_errors = parse_usize("MAGIDIR_SCRAPER_MAX_ERRORS", "5")?;
    let scraper_obey_robots = parse_bool("MAGIDIR_SCRAPER_OBEY_ROBOTS", "true")?;

    if scraper_max_concurrent_requests == 0 {
        return Err(invalid(
            "MAGIDIR_SCRAPER_MAX_CONCURRENT_REQUESTS",
            "must be at least 1".to_string(),
        ));
    }
    if scraper_max_concurrent_per_domain == 0 {
        return Err(invalid(
            "MAGIDIR_SCRAPER_MAX_CONCURRENT_PER_DOMAIN",
            "must be at least 1".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        log_level,
        data_path,
        sources_path,
        scraper_user_agent,
        scraper_request_timeout_secs,
        scraper_max_retries,
        scraper_retry_backoff_base_ms,
        scraper_retry_http_codes,
        scraper_default_delay_ms,
        scraper_max_concurrent_requests,
        scraper_max_concurrent_per_domain,
        scraper_max_errors,
        scraper_obey_robots,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MAGIDIR_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Parse a comma-separated list of HTTP status codes, e.g. `"500, 503,429"`.
fn parse_status_list(var: &str, raw: &str) -> Result<Vec<u16>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u16>()
                .ok()
                .filter(|code| (100..=599).contains(code))
                .ok_or_else(|| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: format!("'{s}' is not an HTTP status code"),
                })
        })
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
