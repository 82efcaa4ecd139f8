//! Headless Chromium page session (cargo feature `browser`).
//!
//! Each session owns one tab on a shared browser process. After the load
//! event the session waits for network traffic to go quiet, then autoscrolls
//! so lazy-loaded cards are in the DOM before the HTML is captured. The
//! navigation timeout covers both the load and the settle wait.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use mindtoys_core::AppConfig;

use super::autoscroll::{autoscroll, AutoscrollPolicy, Scrollable};
use super::settle::{wait_for_network_idle, NetworkActivity, SettlePolicy};
use super::{jittered, page_fetch_from, PageSession, SessionFactory};
use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;
use crate::types::PageFetch;

/// Status of the main document from the Navigation Timing entry; 0 when the
/// browser does not report it.
const NAV_STATUS_JS: &str =
    "(() => { const e = performance.getEntriesByType('navigation')[0]; return e && e.responseStatus ? e.responseStatus : 0; })()";

/// Completed subresource requests. The timing buffer is enlarged first so the
/// count keeps moving past the default 250-entry limit.
const FINISHED_REQUESTS_JS: &str =
    "(() => { performance.setResourceTimingBufferSize(100000); return performance.getEntriesByType('resource').length; })()";

fn browser_err(err: impl std::fmt::Display) -> ScraperError {
    ScraperError::Browser(err.to_string())
}

struct Viewport<'a> {
    page: &'a Page,
}

impl Scrollable for Viewport<'_> {
    async fn scroll_by(&mut self, px: u32) -> Result<(), ScraperError> {
        self.page
            .evaluate(format!("window.scrollBy(0, {px})"))
            .await
            .map_err(browser_err)?;
        Ok(())
    }

    async fn scroll_height(&mut self) -> Result<u64, ScraperError> {
        self.page
            .evaluate("document.body ? document.body.scrollHeight : 0")
            .await
            .map_err(browser_err)?
            .into_value::<u64>()
            .map_err(browser_err)
    }
}

impl NetworkActivity for Viewport<'_> {
    async fn finished_requests(&mut self) -> Result<u64, ScraperError> {
        self.page
            .evaluate(FINISHED_REQUESTS_JS)
            .await
            .map_err(browser_err)?
            .into_value::<u64>()
            .map_err(browser_err)
    }
}

pub struct BrowserSession {
    page: Page,
    settle: SettlePolicy,
    scroll: AutoscrollPolicy,
    max_retries: u32,
    backoff_base_secs: u64,
    inter_page_delay: Duration,
    last_fetch: Option<Instant>,
    // Keeps the browser process alive for as long as this tab exists.
    _browser: Arc<Browser>,
}

impl BrowserSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<String, ScraperError> {
        let timed_out = || ScraperError::Timeout {
            url: url.to_owned(),
            timeout_secs: timeout.as_secs(),
        };

        tokio::time::timeout(timeout, async {
            self.page.goto(url).await.map_err(browser_err)?;
            self.page.wait_for_navigation().await.map_err(browser_err)?;
            let requests =
                wait_for_network_idle(&mut Viewport { page: &self.page }, &self.settle).await?;
            tracing::debug!(url, requests, "network settled");
            Ok::<(), ScraperError>(())
        })
        .await
        .map_err(|_| timed_out())??;

        let status = self
            .page
            .evaluate(NAV_STATUS_JS)
            .await
            .map_err(browser_err)?
            .into_value::<u16>()
            .map_err(browser_err)?;
        match status {
            404 => {
                return Err(ScraperError::NotFound {
                    url: url.to_owned(),
                })
            }
            429 => {
                return Err(ScraperError::RateLimited {
                    domain: url.to_owned(),
                    retry_after_secs: 0,
                })
            }
            s if s >= 400 => {
                return Err(ScraperError::UnexpectedStatus {
                    status: s,
                    url: url.to_owned(),
                })
            }
            _ => {}
        }

        let mut viewport = Viewport { page: &self.page };
        let outcome = tokio::time::timeout(timeout, autoscroll(&mut viewport, &self.scroll))
            .await
            .map_err(|_| timed_out())??;
        tracing::debug!(
            url,
            travelled_px = outcome.travelled_px,
            height = outcome.final_height,
            hit_ceiling = outcome.hit_ceiling,
            "autoscroll finished"
        );

        self.page.content().await.map_err(browser_err)
    }
}

impl PageSession for BrowserSession {
    async fn fetch_page(&mut self, url: &str, timeout: Duration) -> PageFetch {
        if let Some(last) = self.last_fetch {
            let delay = jittered(self.inter_page_delay);
            if last.elapsed() < delay {
                tokio::time::sleep(delay - last.elapsed()).await;
            }
        }
        let result = retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            self.navigate(url, timeout)
        })
        .await;
        self.last_fetch = Some(Instant::now());
        page_fetch_from(result)
    }

    async fn close(self) {
        if let Err(e) = self.page.close().await {
            tracing::debug!(error = %e, "closing browser tab failed");
        }
    }
}

/// Launches one headless Chromium and opens a new tab per session.
pub struct BrowserSessionFactory {
    browser: Arc<Browser>,
    handler: tokio::task::JoinHandle<()>,
    user_agent: String,
    scroll: AutoscrollPolicy,
    max_retries: u32,
    backoff_base_secs: u64,
    inter_page_delay: Duration,
}

impl BrowserSessionFactory {
    /// # Errors
    ///
    /// Returns [`ScraperError::Browser`] if Chromium cannot be found or launched.
    pub async fn launch(config: &AppConfig) -> Result<Self, ScraperError> {
        let browser_config = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(ScraperError::Browser)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(browser_err)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler stopped");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            handler,
            user_agent: config.scraper_user_agent.clone(),
            scroll: AutoscrollPolicy::from_app_config(config),
            max_retries: config.scraper_max_retries,
            backoff_base_secs: config.scraper_retry_backoff_base_secs,
            inter_page_delay: Duration::from_millis(config.scraper_inter_page_delay_ms),
        })
    }
}

impl SessionFactory for BrowserSessionFactory {
    type Session = BrowserSession;

    async fn open(&self) -> Result<BrowserSession, ScraperError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(browser_err)?;
        page.set_user_agent(self.user_agent.as_str())
            .await
            .map_err(browser_err)?;
        Ok(BrowserSession {
            page,
            settle: SettlePolicy::default(),
            scroll: self.scroll,
            max_retries: self.max_retries,
            backoff_base_secs: self.backoff_base_secs,
            inter_page_delay: self.inter_page_delay,
            last_fetch: None,
            _browser: Arc::clone(&self.browser),
        })
    }
}

impl Drop for BrowserSessionFactory {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
