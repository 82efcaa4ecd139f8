//! `mindtoys ingest`: crawl the configured categories into the product store.
//!
//! Category-level failures are part of the printed report and never abort the
//! run; only failures that stop every category mark the run as failed.

use mindtoys_core::{AppConfig, CatalogFile, CategoryTarget, SessionKind};
use mindtoys_db::{PgProductStore, RunCounts};
use mindtoys_ingest::{run_crawl, CancelFlag, CrawlPolicy, IngestMode, Ingestor, RunReport};
use mindtoys_scraper::{Extractor, HttpSessionConfig, HttpSessionFactory};

use crate::{count_i32, fail_run_best_effort};

/// Picks the categories to crawl: all of them, or the single one named by
/// `filter`.
pub(crate) fn select_targets(
    catalog: &CatalogFile,
    filter: Option<&str>,
) -> anyhow::Result<Vec<CategoryTarget>> {
    match filter {
        Some(label) => {
            let target = catalog.category(label).ok_or_else(|| {
                let known: Vec<&str> = catalog.categories.iter().map(|c| c.label.as_str()).collect();
                anyhow::anyhow!(
                    "category '{label}' not found in catalog; known: [{}]",
                    known.join(", ")
                )
            })?;
            Ok(vec![target.clone()])
        }
        None => Ok(catalog.categories.clone()),
    }
}

pub(crate) fn run_counts(report: &RunReport) -> RunCounts {
    let totals = report.totals();
    RunCounts {
        pages_fetched: count_i32(totals.pages_fetched),
        records_inserted: count_i32(totals.inserted),
        records_skipped: count_i32(totals.skipped),
        records_rejected: count_i32(totals.rejected),
        records_removed: count_i32(report.cleared),
    }
}

/// Crawl and ingest.
///
/// A dry run reads the store for existence checks but writes nothing, not even
/// the `crawl_runs` audit row.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, the category filter
/// matches nothing, the session cannot be started, the replace-all clear
/// fails, or every category failed.
pub(crate) async fn run_ingest(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    category_filter: Option<&str>,
    mode: IngestMode,
    dry_run: bool,
) -> anyhow::Result<()> {
    let catalog = mindtoys_core::load_catalog(&config.catalog_path)?;
    let targets = select_targets(&catalog, category_filter)?;
    let extractor = Extractor::from_profile(&catalog.extraction)?;
    ensure_session_supported(config.scraper_session)?;

    let policy = CrawlPolicy::from_app_config(config);
    let ingestor = Ingestor::new(PgProductStore::new(pool.clone()), mode, dry_run);
    let cancel = CancelFlag::new();
    spawn_ctrl_c_listener(cancel.clone());

    tracing::info!(
        categories = targets.len(),
        mode = %ingestor.mode(),
        dry_run = ingestor.is_dry_run(),
        session = %config.scraper_session,
        "starting ingestion"
    );

    let run_id = if ingestor.is_dry_run() {
        None
    } else {
        let run = mindtoys_db::create_crawl_run(pool, "ingest").await?;
        if let Err(e) = mindtoys_db::start_crawl_run(pool, run.id).await {
            fail_run_best_effort(pool, run.id, RunCounts::default(), "ingest", format!("{e:#}"))
                .await;
            return Err(e.into());
        }
        Some(run.id)
    };

    let result = crawl(config, &extractor, &ingestor, &targets, &policy, &cancel).await;

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            if let Some(id) = run_id {
                fail_run_best_effort(pool, id, RunCounts::default(), "ingest", format!("{err:#}"))
                    .await;
            }
            return Err(err);
        }
    };

    if ingestor.is_dry_run() {
        println!("dry-run ({}): nothing was written", ingestor.mode());
    }
    print!("{report}");

    let Some(id) = run_id else {
        return Ok(());
    };
    let counts = run_counts(&report);
    let failed = report.failed_categories();

    if failed > 0 && failed == report.categories.len() {
        let message = format!("all {failed} categories failed");
        fail_run_best_effort(pool, id, counts, "ingest", message.clone()).await;
        anyhow::bail!("{message}");
    }
    if report.was_cancelled() {
        fail_run_best_effort(pool, id, counts, "ingest", "cancelled".to_string()).await;
        println!("run cancelled; partial results kept");
        return Ok(());
    }

    if let Err(err) = mindtoys_db::complete_crawl_run(pool, id, counts).await {
        fail_run_best_effort(pool, id, counts, "ingest", format!("{err:#}")).await;
        return Err(err.into());
    }
    Ok(())
}

async fn crawl(
    config: &AppConfig,
    extractor: &Extractor,
    ingestor: &Ingestor<PgProductStore>,
    targets: &[CategoryTarget],
    policy: &CrawlPolicy,
    cancel: &CancelFlag,
) -> anyhow::Result<RunReport> {
    match config.scraper_session {
        SessionKind::Http => {
            let factory = HttpSessionFactory::new(HttpSessionConfig::from_app_config(config));
            Ok(run_crawl(&factory, extractor, ingestor, targets, policy, cancel).await?)
        }
        SessionKind::Browser => {
            crawl_in_browser(config, extractor, ingestor, targets, policy, cancel).await
        }
    }
}

#[cfg(feature = "browser")]
async fn crawl_in_browser(
    config: &AppConfig,
    extractor: &Extractor,
    ingestor: &Ingestor<PgProductStore>,
    targets: &[CategoryTarget],
    policy: &CrawlPolicy,
    cancel: &CancelFlag,
) -> anyhow::Result<RunReport> {
    let factory = mindtoys_scraper::BrowserSessionFactory::launch(config).await?;
    Ok(run_crawl(&factory, extractor, ingestor, targets, policy, cancel).await?)
}

#[cfg(not(feature = "browser"))]
#[allow(clippy::unused_async)]
async fn crawl_in_browser(
    _config: &AppConfig,
    _extractor: &Extractor,
    _ingestor: &Ingestor<PgProductStore>,
    _targets: &[CategoryTarget],
    _policy: &CrawlPolicy,
    _cancel: &CancelFlag,
) -> anyhow::Result<RunReport> {
    anyhow::bail!("browser sessions are not compiled in")
}

/// Rejects `MINDTOYS_SCRAPER_SESSION=browser` up front when the binary was
/// built without the `browser` feature.
pub(crate) fn ensure_session_supported(kind: SessionKind) -> anyhow::Result<()> {
    if kind == SessionKind::Browser && !cfg!(feature = "browser") {
        anyhow::bail!(
            "MINDTOYS_SCRAPER_SESSION=browser requires building mindtoys with `--features browser`"
        );
    }
    Ok(())
}

fn spawn_ctrl_c_listener(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing the current page before stopping");
            cancel.cancel();
        }
    });
}
