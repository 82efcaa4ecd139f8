//! Database operations for `products`.
//!
//! The unique constraint on `dedup_key` is the duplicate guard: every write
//! path here is insert-or-ignore, so concurrent ingestion cannot create two
//! rows for the same product.

use chrono::{DateTime, Utc};
use mindtoys_core::{NormalizedRecord, StoredIdentity, DEFAULT_QTY};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub image: String,
    pub source_url: String,
    pub qty: i32,
    pub dedup_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inserts `record` unless a product with the same `dedup_key` exists.
///
/// Returns `true` when a row was written, `false` on conflict.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_product_if_absent(
    pool: &PgPool,
    record: &NormalizedRecord,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO products \
             (public_id, name, price, category, image, source_url, qty, dedup_key) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (dedup_key) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(&record.name)
    .bind(record.price)
    .bind(&record.category)
    .bind(&record.image)
    .bind(&record.source_url)
    .bind(DEFAULT_QTY)
    .bind(&record.dedup_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Returns `true` if a product with `dedup_key` is stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn product_exists(pool: &PgPool, dedup_key: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM products WHERE dedup_key = $1)",
    )
    .bind(dedup_key)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Fetches a product by its dedup key.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_product_by_dedup_key(
    pool: &PgPool,
    dedup_key: &str,
) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(
        "SELECT id, public_id, name, price, category, image, source_url, qty, \
                dedup_key, created_at, updated_at \
         FROM products \
         WHERE dedup_key = $1",
    )
    .bind(dedup_key)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Deletes every product. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_products(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM products").execute(pool).await?;
    Ok(result.rows_affected())
}

/// Inserts `records` in one statement, skipping any whose `dedup_key` is
/// already stored or repeats earlier in the batch.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_products_batch(
    pool: &PgPool,
    records: &[NormalizedRecord],
) -> Result<u64, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let public_ids: Vec<Uuid> = records.iter().map(|_| Uuid::new_v4()).collect();
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    let prices: Vec<Decimal> = records.iter().map(|r| r.price).collect();
    let categories: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
    let images: Vec<&str> = records.iter().map(|r| r.image.as_str()).collect();
    let source_urls: Vec<&str> = records.iter().map(|r| r.source_url.as_str()).collect();
    let keys: Vec<&str> = records.iter().map(|r| r.dedup_key.as_str()).collect();

    let result = sqlx::query(
        "INSERT INTO products \
             (public_id, name, price, category, image, source_url, dedup_key, qty) \
         SELECT u.public_id, u.name, u.price, u.category, u.image, u.source_url, u.dedup_key, $8 \
         FROM UNNEST($1::uuid[], $2::text[], $3::numeric[], $4::text[], \
                     $5::text[], $6::text[], $7::text[]) \
              AS u(public_id, name, price, category, image, source_url, dedup_key) \
         ON CONFLICT (dedup_key) DO NOTHING",
    )
    .bind(&public_ids)
    .bind(&names)
    .bind(&prices)
    .bind(&categories)
    .bind(&images)
    .bind(&source_urls)
    .bind(&keys)
    .bind(DEFAULT_QTY)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Returns every product's `id` and current `name`, in `id` order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_identities(pool: &PgPool) -> Result<Vec<StoredIdentity>, DbError> {
    let rows = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM products ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| StoredIdentity { id, name })
        .collect())
}

/// Deletes the products with the given ids in one statement.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_products_by_ids(pool: &PgPool, ids: &[i64]) -> Result<u64, DbError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM products WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
