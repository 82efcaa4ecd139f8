//! `mindtoys dedup`: offline duplicate repair over the whole product table.

use mindtoys_db::{PgProductStore, RunCounts};
use mindtoys_ingest::deduplicate;

use crate::{count_i32, fail_run_best_effort};

/// # Errors
///
/// Returns an error if the run row cannot be created or the scan/delete fails.
pub(crate) async fn run_dedup(pool: &sqlx::PgPool, dry_run: bool) -> anyhow::Result<()> {
    let store = PgProductStore::new(pool.clone());

    if dry_run {
        let report = deduplicate(&store, true).await?;
        println!("dry-run: {report}");
        return Ok(());
    }

    let run = mindtoys_db::create_crawl_run(pool, "dedup").await?;
    if let Err(e) = mindtoys_db::start_crawl_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, RunCounts::default(), "dedup", format!("{e:#}")).await;
        return Err(e.into());
    }

    match deduplicate(&store, false).await {
        Ok(report) => {
            let counts = RunCounts {
                records_removed: count_i32(report.removed),
                ..RunCounts::default()
            };
            if let Err(err) = mindtoys_db::complete_crawl_run(pool, run.id, counts).await {
                fail_run_best_effort(pool, run.id, counts, "dedup", format!("{err:#}")).await;
                return Err(err.into());
            }
            println!("{report}");
            Ok(())
        }
        Err(err) => {
            fail_run_best_effort(pool, run.id, RunCounts::default(), "dedup", format!("{err:#}"))
                .await;
            Err(err.into())
        }
    }
}
