//! Crawl Orchestrator.
//!
//! Each category is walked as a small state machine:
//!
//! ```text
//! Start -> FetchingPage(1) -> Extracting(1) -> FetchingPage(2) -> ... -> Terminated
//! ```
//!
//! - 404 terminates the category (upstream signals "no more pages" this way).
//! - An OK page without cards bumps the empty-page streak; reaching the
//!   threshold terminates, anything less moves on.
//! - An OK page with cards resets the streak and sends its records to the
//!   ingestor.
//! - A timeout or other failure is logged and the next page number is tried.
//!   The failed page itself is never re-fetched.
//! - After page `max_pages` the category terminates regardless.
//!
//! Pages are strictly sequential within a category: page `n + 1` is never
//! requested before page `n` resolved.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use mindtoys_core::{AppConfig, CategoryTarget, ProductStore};
use mindtoys_scraper::{
    fetch_records, normalize, Extractor, PageSession, PageStatus, RawRecord, SessionFactory,
};

use crate::cancel::CancelFlag;
use crate::error::IngestError;
use crate::ingestor::Ingestor;
use crate::report::{CategoryOutcome, CategoryReport, RunReport};

const DEFAULT_EMPTY_PAGE_THRESHOLD: u32 = 2;
const DEFAULT_NAV_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlPolicy {
    /// Consecutive card-less pages that end a category.
    pub empty_page_threshold: u32,
    pub nav_timeout: Duration,
    /// `1` crawls categories one after another on a single shared session.
    pub max_concurrent_categories: usize,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            empty_page_threshold: DEFAULT_EMPTY_PAGE_THRESHOLD,
            nav_timeout: DEFAULT_NAV_TIMEOUT,
            max_concurrent_categories: 1,
        }
    }
}

impl CrawlPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            empty_page_threshold: config.scraper_empty_page_threshold.max(1),
            nav_timeout: Duration::from_secs(config.scraper_nav_timeout_secs),
            max_concurrent_categories: config.scraper_max_concurrent_categories.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlState {
    Start,
    FetchingPage(u32),
    Extracting {
        page: u32,
        page_url: String,
        records: Vec<RawRecord>,
    },
    Terminated(CategoryOutcome),
}

/// The state after page `page` resolved without terminating the category.
fn next_page(page: u32, max_pages: u32) -> CrawlState {
    if page >= max_pages {
        CrawlState::Terminated(CategoryOutcome::PageCap { page })
    } else {
        CrawlState::FetchingPage(page + 1)
    }
}

/// Crawls one category to termination on `session`.
///
/// Never fails: store errors end the category and are recorded in the
/// returned report so the caller can continue with the next category.
pub async fn crawl_category<P, S>(
    session: &mut P,
    extractor: &Extractor,
    ingestor: &Ingestor<S>,
    target: &CategoryTarget,
    policy: &CrawlPolicy,
    cancel: &CancelFlag,
) -> CategoryReport
where
    P: PageSession,
    S: ProductStore,
{
    let label = target.label.as_str();
    let mut report = CategoryReport::new(label, CategoryOutcome::Exhausted { page: 0 });
    let mut empty_streak = 0u32;
    let mut state = CrawlState::Start;

    tracing::info!(category = label, max_pages = target.max_pages, "crawling category");

    let outcome = loop {
        state = match state {
            CrawlState::Start => CrawlState::FetchingPage(1),

            CrawlState::FetchingPage(page) => {
                if cancel.is_cancelled() {
                    CrawlState::Terminated(CategoryOutcome::Cancelled { page })
                } else {
                    let page_url = target.page_url(page);
                    let fetched =
                        fetch_records(session, extractor, &page_url, policy.nav_timeout).await;
                    if fetched.status.is_transient() {
                        report.pages_failed += 1;
                        tracing::warn!(
                            category = label,
                            page,
                            url = %page_url,
                            status = %fetched.status,
                            error = fetched.detail.as_deref().unwrap_or_default(),
                            "page fetch failed, skipping"
                        );
                        next_page(page, target.max_pages)
                    } else if fetched.status == PageStatus::NotFound {
                        tracing::info!(category = label, page, url = %page_url, "page not found, category exhausted");
                        CrawlState::Terminated(CategoryOutcome::Exhausted { page })
                    } else {
                        report.pages_fetched += 1;
                        CrawlState::Extracting {
                            page,
                            page_url,
                            records: fetched.records,
                        }
                    }
                }
            }

            CrawlState::Extracting {
                page,
                page_url,
                records: raw,
            } => {
                report.records_extracted += raw.len() as u64;

                if raw.is_empty() {
                    empty_streak += 1;
                    tracing::info!(category = label, page, empty_streak, "page had no products");
                    if empty_streak >= policy.empty_page_threshold {
                        CrawlState::Terminated(CategoryOutcome::EmptyPages { page })
                    } else {
                        next_page(page, target.max_pages)
                    }
                } else {
                    empty_streak = 0;
                    let mut accepted = Vec::with_capacity(raw.len());
                    for record in &raw {
                        match normalize(record, label, &page_url) {
                            Ok(normalized) => accepted.push(normalized),
                            Err(rejection) => {
                                report.rejected += 1;
                                tracing::debug!(
                                    category = label,
                                    page,
                                    name = record.name_text.as_str(),
                                    reason = %rejection,
                                    "record rejected"
                                );
                            }
                        }
                    }

                    match ingestor.ingest_page(&accepted).await {
                        Ok(tally) => {
                            report.inserted += tally.inserted;
                            report.skipped += tally.skipped;
                            tracing::info!(
                                category = label,
                                page,
                                extracted = raw.len(),
                                inserted = tally.inserted,
                                skipped = tally.skipped,
                                "page ingested"
                            );
                            next_page(page, target.max_pages)
                        }
                        Err(partial) => {
                            report.inserted += partial.tally.inserted;
                            report.skipped += partial.tally.skipped;
                            tracing::error!(
                                category = label,
                                page,
                                inserted = partial.tally.inserted,
                                skipped = partial.tally.skipped,
                                error = %partial.source,
                                "store failure, abandoning category"
                            );
                            report.error = Some(partial.source.to_string());
                            CrawlState::Terminated(CategoryOutcome::StoreFailed { page })
                        }
                    }
                }
            }

            CrawlState::Terminated(outcome) => break outcome,
        };
    };

    report.outcome = outcome;
    tracing::info!(
        category = label,
        outcome = %outcome,
        pages = report.pages_fetched,
        inserted = report.inserted,
        skipped = report.skipped,
        rejected = report.rejected,
        "category finished"
    );
    report
}

/// Crawls every target and returns the run summary.
///
/// With `max_concurrent_categories == 1` one session is opened for the whole
/// run and categories are visited strictly in list order. Otherwise each
/// category opens its own session and up to that many run at once; reports
/// still come back in list order.
///
/// # Errors
///
/// Returns [`IngestError::Store`] if the replace-all clear fails, or
/// [`IngestError::Session`] if the shared session cannot be opened. Failures
/// inside a category never abort the run.
pub async fn run_crawl<F, S>(
    factory: &F,
    extractor: &Extractor,
    ingestor: &Ingestor<S>,
    targets: &[CategoryTarget],
    policy: &CrawlPolicy,
    cancel: &CancelFlag,
) -> Result<RunReport, IngestError>
where
    F: SessionFactory,
    S: ProductStore,
{
    let cleared = ingestor.prepare().await?;
    let concurrency = policy.max_concurrent_categories.max(1);

    let categories = if concurrency == 1 {
        let mut session = factory.open().await?;
        let mut reports = Vec::with_capacity(targets.len());
        for target in targets {
            reports
                .push(crawl_category(&mut session, extractor, ingestor, target, policy, cancel).await);
        }
        session.close().await;
        reports
    } else {
        tracing::info!(concurrency, "crawling categories concurrently");
        stream::iter(targets)
            .map(|target| async move {
                if cancel.is_cancelled() {
                    return CategoryReport::new(&target.label, CategoryOutcome::Cancelled { page: 1 });
                }
                match factory.open().await {
                    Ok(mut session) => {
                        let report =
                            crawl_category(&mut session, extractor, ingestor, target, policy, cancel)
                                .await;
                        session.close().await;
                        report
                    }
                    Err(err) => {
                        tracing::error!(category = target.label.as_str(), error = %err, "could not open page session");
                        let mut report =
                            CategoryReport::new(&target.label, CategoryOutcome::SessionFailed);
                        report.error = Some(err.to_string());
                        report
                    }
                }
            })
            .buffered(concurrency)
            .collect::<Vec<_>>()
            .await
    };

    Ok(RunReport {
        categories,
        cleared,
    })
}

#[cfg(test)]
#[path = "crawl_test.rs"]
mod tests;
