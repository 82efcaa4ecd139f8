//! Offline duplicate repair.
//!
//! Rows written before the dedup-key constraint existed, or renamed out of
//! band, can collide once their names are normalized again. The scan keeps the
//! oldest row (lowest id) of every collision group and deletes the rest in a
//! single call.

use std::collections::HashSet;

use mindtoys_core::{dedup_key, ProductStore, StoredIdentity};

use crate::error::IngestError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupReport {
    pub scanned: u64,
    /// Rows deleted, or that would be deleted on a dry run.
    pub removed: u64,
    pub dry_run: bool,
}

impl std::fmt::Display for DedupReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = if self.dry_run { "would remove" } else { "removed" };
        write!(
            f,
            "scanned {} products, {verb} {} duplicates",
            self.scanned, self.removed
        )
    }
}

/// Ids of every row whose recomputed key was already seen earlier in
/// `identities`. Rows with a blank key are left alone.
#[must_use]
pub fn find_duplicates(identities: &[StoredIdentity]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(identities.len());
    identities
        .iter()
        .filter_map(|row| {
            let key = dedup_key(&row.name);
            if key.is_empty() || seen.insert(key) {
                None
            } else {
                Some(row.id)
            }
        })
        .collect()
}

/// Scans the store and deletes duplicate rows.
///
/// # Errors
///
/// Returns [`IngestError::Store`] if listing or deleting fails. Nothing is
/// deleted when the listing fails.
pub async fn deduplicate<S: ProductStore>(
    store: &S,
    dry_run: bool,
) -> Result<DedupReport, IngestError> {
    let mut identities = store.list_identities().await.map_err(IngestError::store)?;
    identities.sort_by_key(|row| row.id);

    let duplicates = find_duplicates(&identities);
    let scanned = identities.len() as u64;
    tracing::info!(scanned, duplicates = duplicates.len(), dry_run, "dedup scan complete");

    let removed = if duplicates.is_empty() {
        0
    } else if dry_run {
        duplicates.len() as u64
    } else {
        store
            .delete_by_ids(&duplicates)
            .await
            .map_err(IngestError::store)?
    };

    Ok(DedupReport {
        scanned,
        removed,
        dry_run,
    })
}
