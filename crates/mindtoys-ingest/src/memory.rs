//! In-memory [`ProductStore`] with the same insert-or-ignore semantics as the
//! Postgres table. Used by tests and for exercising the pipeline without a
//! database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use mindtoys_core::{NormalizedRecord, ProductStore, StoredIdentity};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("memory store write rejected")]
pub struct MemoryStoreError;

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    by_id: BTreeMap<i64, NormalizedRecord>,
}

impl Rows {
    fn has_key(&self, key: &str) -> bool {
        self.by_id.values().any(|r| r.dedup_key == key)
    }

    fn push(&mut self, record: NormalizedRecord) -> i64 {
        self.next_id += 1;
        self.by_id.insert(self.next_id, record);
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Rows>,
    fail_writes: AtomicBool,
    // Writes allowed before every later one fails; `None` is unlimited.
    write_budget: Mutex<Option<u64>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, simulating an unreachable store.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Lets the next `writes` writes succeed and fails every one after them.
    pub fn fail_writes_after(&self, writes: u64) {
        *self.write_budget.lock().unwrap_or_else(PoisonError::into_inner) = Some(writes);
    }

    /// Appends a row without the dedup-key guard, the way an out-of-band
    /// rename can leave the table. Returns the new id.
    pub fn push_unchecked(&self, record: NormalizedRecord) -> i64 {
        self.lock().push(record)
    }

    /// Stored records in id order.
    #[must_use]
    pub fn records(&self) -> Vec<NormalizedRecord> {
        self.lock().by_id.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Rows> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> Result<(), MemoryStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MemoryStoreError);
        }
        let mut budget = self.write_budget.lock().unwrap_or_else(PoisonError::into_inner);
        match budget.as_mut() {
            Some(0) => Err(MemoryStoreError),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl ProductStore for MemoryStore {
    type Error = MemoryStoreError;

    async fn insert_if_absent(&self, record: &NormalizedRecord) -> Result<bool, Self::Error> {
        self.check_writable()?;
        let mut rows = self.lock();
        if rows.has_key(&record.dedup_key) {
            return Ok(false);
        }
        rows.push(record.clone());
        Ok(true)
    }

    async fn contains_key(&self, dedup_key: &str) -> Result<bool, Self::Error> {
        Ok(self.lock().has_key(dedup_key))
    }

    async fn clear(&self) -> Result<u64, Self::Error> {
        self.check_writable()?;
        let mut rows = self.lock();
        let removed = std::mem::take(&mut rows.by_id);
        Ok(removed.len().try_into().unwrap_or(u64::MAX))
    }

    async fn insert_many(&self, records: &[NormalizedRecord]) -> Result<u64, Self::Error> {
        self.check_writable()?;
        let mut rows = self.lock();
        let mut inserted = 0;
        for record in records {
            if !rows.has_key(&record.dedup_key) {
                rows.push(record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn list_identities(&self) -> Result<Vec<StoredIdentity>, Self::Error> {
        Ok(self
            .lock()
            .by_id
            .iter()
            .map(|(id, r)| StoredIdentity {
                id: *id,
                name: r.name.clone(),
            })
            .collect())
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, Self::Error> {
        self.check_writable()?;
        let mut rows = self.lock();
        let mut removed = 0;
        for id in ids {
            if rows.by_id.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
