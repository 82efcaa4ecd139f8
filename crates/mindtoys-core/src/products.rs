use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quantity assigned to every newly ingested product.
pub const DEFAULT_QTY: i32 = 20;

/// Names shorter than this (in characters, after trimming) are treated as
/// extraction noise such as promo banners.
pub const MIN_NAME_CHARS: usize = 3;

/// Largest price the `products.price NUMERIC(12,2)` column can hold.
pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2); // 9999999999.99

/// A product record that passed normalization and may be written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub image: String,
    pub source_url: String,
    pub dedup_key: String,
}

/// The minimal view of a stored product the offline deduplicator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIdentity {
    pub id: i64,
    pub name: String,
}

/// Canonical identity for a product name: trimmed, lower-cased, with every
/// run of whitespace collapsed to a single ASCII space.
///
/// Two listings whose names differ only in case or spacing share a key and
/// are treated as the same product.
#[must_use]
pub fn dedup_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
