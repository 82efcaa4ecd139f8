//! The persistence seam between the crawl pipeline and whatever owns the
//! product collection.
//!
//! The ingest crate only depends on this trait; the Postgres implementation
//! lives in `mindtoys-db` and tests use an in-memory one.

use std::future::Future;

use crate::products::{NormalizedRecord, StoredIdentity};

pub trait ProductStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Atomically inserts `record` unless a product with the same dedup key
    /// already exists. Returns `true` when a row was written.
    fn insert_if_absent(
        &self,
        record: &NormalizedRecord,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Existence check by dedup key. Never writes.
    fn contains_key(&self, dedup_key: &str)
        -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Removes every product. Returns the number removed.
    fn clear(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    /// Bulk insert that silently ignores dedup-key conflicts. Returns the
    /// number of rows actually written.
    fn insert_many(
        &self,
        records: &[NormalizedRecord],
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    /// Every stored product's id and current name, in storage (id) order.
    fn list_identities(&self) -> impl Future<Output = Result<Vec<StoredIdentity>, Self::Error>> + Send;

    /// Removes the given ids in one operation. Returns the number removed.
    fn delete_by_ids(&self, ids: &[i64]) -> impl Future<Output = Result<u64, Self::Error>> + Send;
}
