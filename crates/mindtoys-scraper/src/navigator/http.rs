//! Static-HTML page session over `reqwest`.
//!
//! No script runs, so lazy-loaded cards must already be in the served markup.
//! Lazy images are still recoverable through their `data-src` attributes.

use std::time::{Duration, Instant};

use mindtoys_core::AppConfig;
use reqwest::{Client, StatusCode};

use super::{jittered, page_fetch_from, PageSession, SessionFactory};
use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;
use crate::types::PageFetch;

#[derive(Debug, Clone)]
pub struct HttpSessionConfig {
    pub user_agent: String,
    /// Additional attempts after an HTTP 429.
    pub max_retries: u32,
    pub backoff_base_secs: u64,
    /// Minimum spacing between consecutive fetches on one session, jittered ±25%.
    pub inter_page_delay: Duration,
}

impl HttpSessionConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.scraper_user_agent.clone(),
            max_retries: config.scraper_max_retries,
            backoff_base_secs: config.scraper_retry_backoff_base_secs,
            inter_page_delay: Duration::from_millis(config.scraper_inter_page_delay_ms),
        }
    }
}

pub struct HttpSession {
    client: Client,
    config: HttpSessionConfig,
    last_fetch: Option<Instant>,
}

impl HttpSession {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: HttpSessionConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            config,
            last_fetch: None,
        })
    }

    async fn pace(&self) {
        let Some(last) = self.last_fetch else {
            return;
        };
        let delay = jittered(self.config.inter_page_delay);
        let elapsed = last.elapsed();
        if elapsed < delay {
            tokio::time::sleep(delay - elapsed).await;
        }
    }

    async fn get_html(&self, url: &str, timeout: Duration) -> Result<String, ScraperError> {
        reqwest::Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;

        retry_with_backoff(self.config.max_retries, self.config.backoff_base_secs, || {
            let url = url.to_owned();
            async move {
                let response = self
                    .client
                    .get(&url)
                    .timeout(timeout)
                    .header(
                        reqwest::header::ACCEPT,
                        "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
                    )
                    .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                    .send()
                    .await
                    .map_err(|e| classify(e, &url, timeout))?;
                let status = response.status();

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(ScraperError::RateLimited {
                        domain: extract_domain(&url),
                        retry_after_secs,
                    });
                }

                if status == StatusCode::NOT_FOUND {
                    return Err(ScraperError::NotFound { url });
                }

                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                response.text().await.map_err(|e| classify(e, &url, timeout))
            }
        })
        .await
    }
}

impl PageSession for HttpSession {
    async fn fetch_page(&mut self, url: &str, timeout: Duration) -> PageFetch {
        self.pace().await;
        let result = self.get_html(url, timeout).await;
        self.last_fetch = Some(Instant::now());
        page_fetch_from(result)
    }
}

/// Builds a fresh [`HttpSession`] (own connection pool and pacing clock) per
/// category.
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    config: HttpSessionConfig,
}

impl HttpSessionFactory {
    #[must_use]
    pub fn new(config: HttpSessionConfig) -> Self {
        Self { config }
    }
}

impl SessionFactory for HttpSessionFactory {
    type Session = HttpSession;

    async fn open(&self) -> Result<HttpSession, ScraperError> {
        HttpSession::new(self.config.clone())
    }
}

fn classify(err: reqwest::Error, url: &str, timeout: Duration) -> ScraperError {
    if err.is_timeout() {
        ScraperError::Timeout {
            url: url.to_owned(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        ScraperError::Http(err)
    }
}

fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}
