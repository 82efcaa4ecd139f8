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

/// Which page-session backend the crawler drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Plain HTTP fetch of the server-rendered HTML.
    Http,
    /// Headless Chromium with autoscroll; requires the `browser` build feature.
    Browser,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::Http => write!(f, "http"),
            SessionKind::Browser => write!(f, "browser"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub catalog_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scraper_session: SessionKind,
    pub scraper_nav_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_inter_page_delay_ms: u64,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,
    pub scraper_empty_page_threshold: u32,
    pub scraper_max_concurrent_categories: usize,
    pub scraper_scroll_step_px: u32,
    pub scraper_scroll_interval_ms: u64,
    pub scraper_scroll_ceiling_px: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("catalog_path", &self.catalog_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("scraper_session", &self.scraper_session)
            .field("scraper_nav_timeout_secs", &self.scraper_nav_timeout_secs)
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field(
                "scraper_inter_page_delay_ms",
                &self.scraper_inter_page_delay_ms,
            )
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_backoff_base_secs",
                &self.scraper_retry_backoff_base_secs,
            )
            .field(
                "scraper_empty_page_threshold",
                &self.scraper_empty_page_threshold,
            )
            .field(
                "scraper_max_concurrent_categories",
                &self.scraper_max_concurrent_categories,
            )
            .field("scraper_scroll_step_px", &self.scraper_scroll_step_px)
            .field("scraper_scroll_interval_ms", &self.scraper_scroll_interval_ms)
            .field("scraper_scroll_ceiling_px", &self.scraper_scroll_ceiling_px)
            .finish()
    }
}
