//! Normalization from [`RawRecord`] to [`mindtoys_core::NormalizedRecord`].
//!
//! Rejections are ordinary values: malformed cards are expected on every
//! crawl and are counted by the caller, never raised.

use std::str::FromStr;
use std::sync::LazyLock;

use mindtoys_core::{dedup_key, NormalizedRecord, MAX_PRICE, MIN_NAME_CHARS};
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::RawRecord;

static NON_PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.]").expect("valid price regex"));

/// Separators between the low and high amount of a price range.
const RANGE_SEPARATORS: [char; 2] = ['–', '—'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("name shorter than {} characters", MIN_NAME_CHARS)]
    NameTooShort,

    #[error("image reference is empty")]
    MissingImage,

    #[error("price text {0:?} does not contain a number")]
    UnparseablePrice(String),

    #[error("price {0} is not positive")]
    NonPositivePrice(Decimal),

    /// Usually several amounts (or a phone number) glued together by the
    /// digit strip.
    #[error("price {0} exceeds {max}", max = MAX_PRICE)]
    PriceOutOfRange(Decimal),
}

/// Normalizes `raw` for `category`.
///
/// `page_url` becomes the record's source URL when the card had no link.
///
/// # Errors
///
/// Returns the [`Rejection`] that disqualified the record.
pub fn normalize(
    raw: &RawRecord,
    category: &str,
    page_url: &str,
) -> Result<NormalizedRecord, Rejection> {
    let name = raw.name_text.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.chars().count() < MIN_NAME_CHARS {
        return Err(Rejection::NameTooShort);
    }

    let image = raw.image_ref.trim();
    if image.is_empty() {
        return Err(Rejection::MissingImage);
    }

    let price = parse_price(&raw.price_text)?;

    let source_url = raw
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(page_url);

    Ok(NormalizedRecord {
        dedup_key: dedup_key(&name),
        name,
        price,
        category: category.to_owned(),
        image: image.to_owned(),
        source_url: source_url.to_owned(),
    })
}

/// Parses storefront price text such as `"৳ 1,250.00"`, `"Tk. 180"` or
/// `"৳৫৫০"` into a positive amount rounded to two decimal places.
///
/// Bengali digits are transliterated, then everything except ASCII digits
/// and `.` is stripped. For a range (`"৳ 500 – ৳ 700"`) the low end is used.
///
/// # Errors
///
/// [`Rejection::UnparseablePrice`] when no number remains,
/// [`Rejection::NonPositivePrice`] when it rounds to zero,
/// [`Rejection::PriceOutOfRange`] when it does not fit the price column.
pub fn parse_price(text: &str) -> Result<Decimal, Rejection> {
    let low_end = text.split(RANGE_SEPARATORS).next().unwrap_or_default();
    let ascii: String = low_end.chars().map(transliterate_digit).collect();
    let stripped = NON_PRICE_RE.replace_all(&ascii, "");
    let cleaned = stripped.trim_matches('.');

    if cleaned.is_empty() {
        return Err(Rejection::UnparseablePrice(text.to_owned()));
    }

    let price = Decimal::from_str(cleaned)
        .map_err(|_| Rejection::UnparseablePrice(text.to_owned()))?
        .round_dp(2);

    if price <= Decimal::ZERO {
        return Err(Rejection::NonPositivePrice(price));
    }
    if price > MAX_PRICE {
        return Err(Rejection::PriceOutOfRange(price));
    }
    Ok(price)
}

fn transliterate_digit(c: char) -> char {
    match c {
        '০'..='৯' => char::from_digit(u32::from(c) - u32::from('০'), 10).unwrap_or(c),
        _ => c,
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
