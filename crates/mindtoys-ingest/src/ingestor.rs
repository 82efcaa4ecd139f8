//! Writes normalized records to the product store without creating
//! duplicates.
//!
//! Incremental mode relies on the store's atomic insert-or-ignore, so two
//! categories crawled concurrently can never race each other into a duplicate.
//! Replace-all mode clears the store once before the crawl and then bulk
//! inserts every page; the two modes never mix within a run.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use mindtoys_core::{NormalizedRecord, ProductStore};
use thiserror::Error;

use crate::error::IngestError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IngestMode {
    #[default]
    Incremental,
    ReplaceAll,
}

impl std::fmt::Display for IngestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestMode::Incremental => write!(f, "incremental"),
            IngestMode::ReplaceAll => write!(f, "replace-all"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Inserted,
    Skipped,
}

/// Inserted vs. skipped counts for one batch of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTally {
    pub inserted: u64,
    pub skipped: u64,
}

/// A page that stopped on a store failure. `tally` counts the records
/// handled before the failure; those rows stay written.
#[derive(Debug, Error)]
#[error("page ingest stopped after {} inserted and {} skipped: {source}", .tally.inserted, .tally.skipped)]
pub struct PartialPage {
    pub tally: PageTally,
    #[source]
    pub source: IngestError,
}

impl PartialPage {
    fn new(tally: PageTally, source: IngestError) -> Self {
        Self { tally, source }
    }
}

pub struct Ingestor<S> {
    store: S,
    mode: IngestMode,
    dry_run: bool,
    prepared: AtomicBool,
    // Keys a dry run would have written; stands in for the writes it skips.
    planned: Mutex<HashSet<String>>,
}

impl<S: ProductStore> Ingestor<S> {
    #[must_use]
    pub fn new(store: S, mode: IngestMode, dry_run: bool) -> Self {
        Self {
            store,
            mode,
            dry_run,
            prepared: AtomicBool::new(false),
            planned: Mutex::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn mode(&self) -> IngestMode {
        self.mode
    }

    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run-start hook. In replace-all mode this clears the store exactly once
    /// and returns the number of rows removed; otherwise it is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Store`] if clearing fails.
    pub async fn prepare(&self) -> Result<u64, IngestError> {
        if self.mode != IngestMode::ReplaceAll || self.prepared.swap(true, Ordering::SeqCst) {
            return Ok(0);
        }
        if self.dry_run {
            tracing::info!("dry run: store would be cleared before replace-all ingestion");
            return Ok(0);
        }
        let removed = self.store.clear().await.map_err(IngestError::store)?;
        tracing::info!(removed, "cleared product store for replace-all ingestion");
        Ok(removed)
    }

    /// Ingests a single record.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Store`] if the store rejects the read or write.
    pub async fn ingest(&self, record: &NormalizedRecord) -> Result<IngestOutcome, IngestError> {
        let tally = self
            .ingest_page(std::slice::from_ref(record))
            .await
            .map_err(|partial| partial.source)?;
        Ok(if tally.inserted == 1 {
            IngestOutcome::Inserted
        } else {
            IngestOutcome::Skipped
        })
    }

    /// Ingests one page worth of records.
    ///
    /// # Errors
    ///
    /// Returns [`PartialPage`] on the first store failure, carrying the counts
    /// for the records handled before it.
    pub async fn ingest_page(&self, records: &[NormalizedRecord]) -> Result<PageTally, PartialPage> {
        if records.is_empty() {
            return Ok(PageTally::default());
        }
        if self.dry_run {
            return self.plan_page(records).await;
        }

        match self.mode {
            IngestMode::Incremental => {
                let mut tally = PageTally::default();
                for record in records {
                    match self.store.insert_if_absent(record).await {
                        Ok(true) => tally.inserted += 1,
                        Ok(false) => tally.skipped += 1,
                        Err(err) => return Err(PartialPage::new(tally, IngestError::store(err))),
                    }
                }
                Ok(tally)
            }
            IngestMode::ReplaceAll => {
                // One statement: a failed batch wrote nothing.
                let inserted = self
                    .store
                    .insert_many(records)
                    .await
                    .map_err(|err| PartialPage::new(PageTally::default(), IngestError::store(err)))?;
                Ok(PageTally {
                    inserted,
                    skipped: records.len() as u64 - inserted,
                })
            }
        }
    }

    /// Dry-run counterpart of [`Self::ingest_page`]: reads only.
    async fn plan_page(&self, records: &[NormalizedRecord]) -> Result<PageTally, PartialPage> {
        let mut tally = PageTally::default();
        for record in records {
            let stored = match self.mode {
                IngestMode::Incremental => match self.store.contains_key(&record.dedup_key).await {
                    Ok(stored) => stored,
                    Err(err) => return Err(PartialPage::new(tally, IngestError::store(err))),
                },
                // The store would have been cleared at run start.
                IngestMode::ReplaceAll => false,
            };
            let newly_planned = self
                .planned
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(record.dedup_key.clone());
            if !stored && newly_planned {
                tally.inserted += 1;
            } else {
                tally.skipped += 1;
            }
        }
        Ok(tally)
    }
}
