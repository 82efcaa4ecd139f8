//! Page sessions: the only component that talks to the upstream site.
//!
//! A session owns exactly one "current page", so fetching takes `&mut self`
//! and a second fetch cannot start until the first has resolved. Concurrent
//! category crawls each open their own session through a [`SessionFactory`].

pub mod autoscroll;
#[cfg(feature = "browser")]
pub mod browser;
pub mod http;
pub mod settle;

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;
use crate::extract::Extractor;
use crate::types::{PageFetch, PageFetchResult, PageStatus};

pub trait PageSession: Send {
    /// Navigates to `url` and returns its status and HTML.
    ///
    /// Never fails: every error is folded into [`PageStatus`] so the caller
    /// decides whether to skip or terminate.
    fn fetch_page(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = PageFetch> + Send;

    /// Releases the session. The default does nothing.
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized,
    {
        async {}
    }
}

/// Opens independent sessions, one per concurrently crawled category.
pub trait SessionFactory: Send + Sync {
    type Session: PageSession;

    fn open(&self) -> impl Future<Output = Result<Self::Session, ScraperError>> + Send;
}

/// Fetches `url` on `session` and extracts its product cards.
///
/// The document is parsed only after the fetch resolved, so nothing parsed is
/// held across the await.
pub async fn fetch_records<P: PageSession>(
    session: &mut P,
    extractor: &Extractor,
    url: &str,
    timeout: Duration,
) -> PageFetchResult {
    let fetch = session.fetch_page(url, timeout).await;
    let records = if fetch.status == PageStatus::Ok {
        extractor.extract(&fetch.html, url)
    } else {
        Vec::new()
    };
    PageFetchResult {
        status: fetch.status,
        records,
        detail: fetch.detail,
    }
}

/// Folds a navigation result into the status taxonomy the crawl understands.
pub(crate) fn page_fetch_from(result: Result<String, ScraperError>) -> PageFetch {
    match result {
        Ok(html) => PageFetch::ok(html),
        Err(err @ ScraperError::NotFound { .. }) => {
            PageFetch::failed(PageStatus::NotFound, err.to_string())
        }
        Err(err @ ScraperError::Timeout { .. }) => {
            PageFetch::failed(PageStatus::Timeout, err.to_string())
        }
        Err(err) => PageFetch::failed(PageStatus::OtherError, err.to_string()),
    }
}

/// `base` scaled by a random factor in `[0.75, 1.25)`.
pub(crate) fn jittered(base: Duration) -> Duration {
    if base.is_zero() {
        return base;
    }
    base.mul_f64(rand::random::<f64>() * 0.5 + 0.75)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_not_found_status() {
        let fetch = page_fetch_from(Err(ScraperError::NotFound {
            url: "https://shop.example/toys/page/4/".to_string(),
        }));
        assert_eq!(fetch.status, PageStatus::NotFound);
        assert!(fetch.html.is_empty());
    }

    #[test]
    fn timeout_maps_to_timeout_status() {
        let fetch = page_fetch_from(Err(ScraperError::Timeout {
            url: "https://shop.example/toys/".to_string(),
            timeout_secs: 60,
        }));
        assert_eq!(fetch.status, PageStatus::Timeout);
        assert!(fetch.detail.unwrap().contains("60s"));
    }

    #[test]
    fn other_failures_map_to_other_error() {
        let fetch = page_fetch_from(Err(ScraperError::UnexpectedStatus {
            status: 500,
            url: "https://shop.example/toys/".to_string(),
        }));
        assert_eq!(fetch.status, PageStatus::OtherError);
    }

    #[test]
    fn jitter_stays_within_a_quarter_of_base() {
        let base = Duration::from_millis(400);
        for _ in 0..100 {
            let d = jittered(base);
            assert!(d >= Duration::from_millis(300) && d <= Duration::from_millis(500));
        }
        assert_eq!(jittered(Duration::ZERO), Duration::ZERO);
    }

    struct OnePage(PageFetch);

    impl PageSession for OnePage {
        async fn fetch_page(&mut self, _url: &str, _timeout: Duration) -> PageFetch {
            self.0.clone()
        }
    }

    fn extractor() -> Extractor {
        Extractor::from_profile(&mindtoys_core::ExtractionProfile::default()).unwrap()
    }

    #[tokio::test]
    async fn fetch_records_extracts_cards_from_ok_page() {
        let html = r#"<div class="product-small"><img src="/a.jpg"><p class="name">Duck Toy</p><span class="price">৳ 550</span></div>"#;
        let mut session = OnePage(PageFetch::ok(html.to_string()));

        let result = fetch_records(
            &mut session,
            &extractor(),
            "https://shop.example/toys/",
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(result.status, PageStatus::Ok);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].image_ref, "https://shop.example/a.jpg");
    }

    #[tokio::test]
    async fn fetch_records_failed_page_has_no_records() {
        let mut session = OnePage(PageFetch::failed(PageStatus::Timeout, "timed out"));

        let result = fetch_records(
            &mut session,
            &extractor(),
            "https://shop.example/toys/page/2/",
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(result.status, PageStatus::Timeout);
        assert!(result.records.is_empty());
        assert_eq!(result.detail.as_deref(), Some("timed out"));
    }
}
