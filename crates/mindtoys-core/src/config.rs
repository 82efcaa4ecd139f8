use std::str::FromStr;

use crate::app_config::{AppConfig, Environment, SessionKind};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
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
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function,
/// so parsing can be tested against a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("MINDTOYS_ENV", "development"))?;
    let log_level = or_default("MINDTOYS_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default(
        "MINDTOYS_CATALOG_PATH",
        "./config/catalog.yaml",
    ));

    let db_max_connections = parse_var(&or_default, "MINDTOYS_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_var(&or_default, "MINDTOYS_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs =
        parse_var(&or_default, "MINDTOYS_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let scraper_session = parse_session_kind(&or_default("MINDTOYS_SCRAPER_SESSION", "http"))?;
    let scraper_nav_timeout_secs =
        parse_var(&or_default, "MINDTOYS_SCRAPER_NAV_TIMEOUT_SECS", "60")?;
    let scraper_user_agent = or_default("MINDTOYS_SCRAPER_USER_AGENT", DEFAULT_USER_AGENT);
    let scraper_inter_page_delay_ms =
        parse_var(&or_default, "MINDTOYS_SCRAPER_INTER_PAGE_DELAY_MS", "500")?;
    let scraper_max_retries = parse_var(&or_default, "MINDTOYS_SCRAPER_MAX_RETRIES", "2")?;
    let scraper_retry_backoff_base_secs =
        parse_var(&or_default, "MINDTOYS_SCRAPER_RETRY_BACKOFF_BASE_SECS", "5")?;
    let scraper_empty_page_threshold =
        parse_var(&or_default, "MINDTOYS_SCRAPER_EMPTY_PAGE_THRESHOLD", "2")?;
    let scraper_max_concurrent_categories =
        parse_var(&or_default, "MINDTOYS_SCRAPER_MAX_CONCURRENT_CATEGORIES", "1")?;
    let scraper_scroll_step_px = parse_var(&or_default, "MINDTOYS_SCRAPER_SCROLL_STEP_PX", "100")?;
    let scraper_scroll_interval_ms =
        parse_var(&or_default, "MINDTOYS_SCRAPER_SCROLL_INTERVAL_MS", "40")?;
    let scraper_scroll_ceiling_px =
        parse_var(&or_default, "MINDTOYS_SCRAPER_SCROLL_CEILING_PX", "30000")?;

    if scraper_empty_page_threshold == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MINDTOYS_SCRAPER_EMPTY_PAGE_THRESHOLD".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        catalog_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        scraper_session,
        scraper_nav_timeout_secs,
        scraper_user_agent,
        scraper_inter_page_delay_ms,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
        scraper_empty_page_threshold,
        scraper_max_concurrent_categories,
        scraper_scroll_step_px,
        scraper_scroll_interval_ms,
        scraper_scroll_ceiling_px,
    })
}

fn parse_var<T, D>(or_default: D, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    D: Fn(&str, &str) -> String,
{
    let raw = or_default(var, default);
    raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MINDTOYS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_session_kind(s: &str) -> Result<SessionKind, ConfigError> {
    match s.to_ascii_lowercase().as_str() {
        "http" => Ok(SessionKind::Http),
        "browser" => Ok(SessionKind::Browser),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MINDTOYS_SCRAPER_SESSION".to_string(),
            reason: format!("expected 'http' or 'browser', got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
