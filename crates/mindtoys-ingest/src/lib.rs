//! The crawl-and-ingest pipeline: drives page sessions over every category,
//! feeds extracted records through normalization into a [`ProductStore`], and
//! repairs duplicate rows offline.
//!
//! [`ProductStore`]: mindtoys_core::ProductStore

pub mod cancel;
pub mod crawl;
pub mod dedup;
pub mod error;
pub mod ingestor;
pub mod memory;
pub mod report;

pub use cancel::CancelFlag;
pub use crawl::{crawl_category, run_crawl, CrawlPolicy, CrawlState};
pub use dedup::{deduplicate, find_duplicates, DedupReport};
pub use error::IngestError;
pub use ingestor::{IngestMode, IngestOutcome, Ingestor, PageTally, PartialPage};
pub use memory::MemoryStore;
pub use report::{CategoryOutcome, CategoryReport, RunReport, RunTotals};
