//! Offline unit tests for mindtoys-db pool configuration and row types.
//! These tests do not require a live database connection.

use mindtoys_core::{AppConfig, Environment, SessionKind};
use mindtoys_db::{CrawlRunRow, DbError, PoolConfig, ProductRow, RunCounts};
use std::path::PathBuf;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        catalog_path: PathBuf::from("./config/catalog.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        scraper_session: SessionKind::Http,
        scraper_nav_timeout_secs: 60,
        scraper_user_agent: "ua".to_string(),
        scraper_inter_page_delay_ms: 500,
        scraper_max_retries: 2,
        scraper_retry_backoff_base_secs: 5,
        scraper_empty_page_threshold: 2,
        scraper_max_concurrent_categories: 1,
        scraper_scroll_step_px: 100,
        scraper_scroll_interval_ms: 40,
        scraper_scroll_ceiling_px: 30_000,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`CrawlRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn crawl_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = CrawlRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        run_type: "ingest".to_string(),
        status: "queued".to_string(),
        started_at: None,
        completed_at: None,
        pages_fetched: 0,
        records_inserted: 0,
        records_skipped: 0,
        records_rejected: 0,
        records_removed: 0,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.run_type, "ingest");
    assert_eq!(row.status, "queued");
    assert!(row.started_at.is_none());
    assert!(row.error_message.is_none());
}

#[test]
fn product_row_has_expected_fields() {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    let row = ProductRow {
        id: 42,
        public_id: Uuid::new_v4(),
        name: "Duck Toy".to_string(),
        price: Decimal::new(55_000, 2),
        category: "Toys & Gaming".to_string(),
        image: "https://cdn.example/duck.jpg".to_string(),
        source_url: "https://shop.example/product/duck-toy/".to_string(),
        qty: mindtoys_core::DEFAULT_QTY,
        dedup_key: "duck toy".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.qty, 20);
    assert_eq!(row.price.to_string(), "550.00");
}

#[test]
fn run_counts_default_to_zero() {
    assert_eq!(
        RunCounts::default(),
        RunCounts {
            pages_fetched: 0,
            records_inserted: 0,
            records_skipped: 0,
            records_rejected: 0,
            records_removed: 0,
        }
    );
}

#[test]
fn invalid_transition_error_names_expected_status() {
    let err = DbError::InvalidRunTransition {
        id: 7,
        expected_status: "running",
    };
    assert_eq!(
        err.to_string(),
        "crawl run 7 is not in expected status 'running'"
    );
}
