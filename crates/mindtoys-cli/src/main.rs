mod dedup;
mod ingest;

use clap::{Parser, Subcommand, ValueEnum};
use mindtoys_ingest::IngestMode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mindtoys")]
#[command(about = "Crawl product listings into the mindtoys catalog")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl every configured category and ingest its products
    Ingest {
        /// Crawl a single category (by label, case-insensitive)
        #[arg(long)]
        category: Option<String>,

        /// How records are written to the product store
        #[arg(long, value_enum, default_value_t = ModeArg::Incremental)]
        mode: ModeArg,

        /// Crawl and normalize without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove products whose normalized names collide
    Dedup {
        /// Report duplicates without deleting them
        #[arg(long)]
        dry_run: bool,
    },
    /// Show recent ingest and dedup runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Incremental,
    ReplaceAll,
}

impl From<ModeArg> for IngestMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Incremental => IngestMode::Incremental,
            ModeArg::ReplaceAll => IngestMode::ReplaceAll,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("mindtoys: nothing to do (try `mindtoys --help`)");
        return Ok(());
    };

    let config = mindtoys_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = mindtoys_db::PoolConfig::from_app_config(&config);
    let pool = mindtoys_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Ingest {
            category,
            mode,
            dry_run,
        } => {
            mindtoys_db::ping(&pool).await?;
            ingest::run_ingest(&pool, &config, category.as_deref(), mode.into(), dry_run).await?;
        }
        Commands::Dedup { dry_run } => {
            mindtoys_db::ping(&pool).await?;
            dedup::run_dedup(&pool, dry_run).await?;
        }
        Commands::Runs { limit } => print_runs(&pool, limit).await?,
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = mindtoys_db::run_migrations(&pool).await?;
            println!("applied {applied} migrations");
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            mindtoys_db::ping(&pool).await?;
            println!("database reachable");
        }
    }

    Ok(())
}

async fn print_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = mindtoys_db::list_crawl_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no runs recorded yet");
        return Ok(());
    }

    println!(
        "{:>6}  {:<7} {:<10} {:<20} {:>6} {:>8} {:>8} {:>8} {:>8}",
        "id", "type", "status", "started", "pages", "inserted", "skipped", "rejected", "removed"
    );
    for run in runs {
        let started = run.started_at.map_or_else(
            || "-".to_string(),
            |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        println!(
            "{:>6}  {:<7} {:<10} {:<20} {:>6} {:>8} {:>8} {:>8} {:>8}",
            run.id,
            run.run_type,
            run.status,
            started,
            run.pages_fetched,
            run.records_inserted,
            run.records_skipped,
            run.records_rejected,
            run.records_removed
        );
        if let Some(message) = run.error_message {
            println!("        error: {message}");
        }
    }
    Ok(())
}

/// Attempt to mark a crawl run as failed, logging any secondary error.
async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    counts: mindtoys_db::RunCounts,
    context: &'static str,
    message: String,
) {
    if let Err(mark_err) = mindtoys_db::fail_crawl_run(pool, run_id, counts, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {context} run as failed"
        );
    }
}

/// Saturating `u64 -> i32` for the run counters.
fn count_i32(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
