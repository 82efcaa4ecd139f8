use mindtoys_core::{NormalizedRecord, ProductStore, StoredIdentity};
use sqlx::PgPool;

use crate::{products, DbError};

/// [`ProductStore`] backed by the Postgres `products` table.
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl ProductStore for PgProductStore {
    type Error = DbError;

    async fn insert_if_absent(&self, record: &NormalizedRecord) -> Result<bool, DbError> {
        products::insert_product_if_absent(&self.pool, record).await
    }

    async fn contains_key(&self, dedup_key: &str) -> Result<bool, DbError> {
        products::product_exists(&self.pool, dedup_key).await
    }

    async fn clear(&self) -> Result<u64, DbError> {
        products::clear_products(&self.pool).await
    }

    async fn insert_many(&self, records: &[NormalizedRecord]) -> Result<u64, DbError> {
        products::insert_products_batch(&self.pool, records).await
    }

    async fn list_identities(&self) -> Result<Vec<StoredIdentity>, DbError> {
        products::list_product_identities(&self.pool).await
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, DbError> {
        products::delete_products_by_ids(&self.pool, ids).await
    }
}
