use super::*;

const PAGE_URL: &str = "https://shop.example/product-category/toys/page/2/";

fn raw(name: &str, price: &str) -> RawRecord {
    RawRecord {
        name_text: name.to_owned(),
        price_text: price.to_owned(),
        image_ref: "https://cdn.example/duck.jpg".to_owned(),
        link: Some("https://shop.example/product/duck-toy/".to_owned()),
    }
}

// -----------------------------------------------------------------------
// parse_price
// -----------------------------------------------------------------------

#[test]
fn parse_price_plain_number() {
    assert_eq!(parse_price("550"), Ok(Decimal::new(550, 0)));
}

#[test]
fn parse_price_bengali_digits_with_symbol() {
    assert_eq!(parse_price("৳৫৫০"), Ok(Decimal::new(550, 0)));
}

#[test]
fn parse_price_strips_symbol_spaces_and_grouping() {
    assert_eq!(parse_price("৳ 1,250.00"), Ok(Decimal::new(125_000, 2)));
}

#[test]
fn parse_price_trims_abbreviation_dot() {
    assert_eq!(parse_price("Tk. 180"), Ok(Decimal::new(180, 0)));
}

#[test]
fn parse_price_takes_low_end_of_range() {
    assert_eq!(parse_price("৳ 500 – ৳ 700"), Ok(Decimal::new(500, 0)));
}

#[test]
fn parse_price_rounds_to_cents() {
    assert_eq!(parse_price("19.999"), Ok(Decimal::new(2000, 2)));
}

#[test]
fn parse_price_free_is_rejected() {
    assert_eq!(
        parse_price("Free"),
        Err(Rejection::UnparseablePrice("Free".to_owned()))
    );
}

#[test]
fn parse_price_zero_is_rejected() {
    assert!(matches!(
        parse_price("৳ 0.00"),
        Err(Rejection::NonPositivePrice(_))
    ));
}

#[test]
fn parse_price_empty_is_rejected() {
    assert!(matches!(
        parse_price(""),
        Err(Rejection::UnparseablePrice(_))
    ));
}

#[test]
fn parse_price_multiple_decimal_points_is_rejected() {
    assert!(matches!(
        parse_price("1.200.50"),
        Err(Rejection::UnparseablePrice(_))
    ));
}

// -----------------------------------------------------------------------
// normalize
// -----------------------------------------------------------------------

#[test]
fn normalize_builds_full_record() {
    let record = normalize(&raw("  Duck   Toy ", "৳ 550"), "Toys & Gaming", PAGE_URL).unwrap();
    assert_eq!(record.name, "Duck Toy");
    assert_eq!(record.dedup_key, "duck toy");
    assert_eq!(record.price, Decimal::new(550, 0));
    assert_eq!(record.category, "Toys & Gaming");
    assert_eq!(record.image, "https://cdn.example/duck.jpg");
    assert_eq!(record.source_url, "https://shop.example/product/duck-toy/");
}

#[test]
fn normalize_case_variants_share_dedup_key() {
    let a = normalize(&raw("Duck Toy ", "550"), "Toys", PAGE_URL).unwrap();
    let b = normalize(&raw("duck toy", "550"), "Toys", PAGE_URL).unwrap();
    assert_eq!(a.dedup_key, b.dedup_key);
}

#[test]
fn normalize_falls_back_to_page_url_without_link() {
    let mut r = raw("Duck Toy", "550");
    r.link = None;
    let record = normalize(&r, "Toys", PAGE_URL).unwrap();
    assert_eq!(record.source_url, PAGE_URL);
}

#[test]
fn normalize_rejects_short_names() {
    assert_eq!(
        normalize(&raw(" Hi ", "550"), "Toys", PAGE_URL),
        Err(Rejection::NameTooShort)
    );
}

#[test]
fn normalize_accepts_three_character_name() {
    assert!(normalize(&raw("Top", "550"), "Toys", PAGE_URL).is_ok());
}

#[test]
fn normalize_counts_bengali_name_by_characters() {
    assert!(normalize(&raw("বল", "550"), "Toys", PAGE_URL).is_err());
    assert!(normalize(&raw("খেলনা", "550"), "Toys", PAGE_URL).is_ok());
}

#[test]
fn normalize_rejects_blank_image() {
    let mut r = raw("Duck Toy", "550");
    r.image_ref = "  ".to_owned();
    assert_eq!(
        normalize(&r, "Toys", PAGE_URL),
        Err(Rejection::MissingImage)
    );
}

#[test]
fn normalize_rejects_free_items() {
    assert!(matches!(
        normalize(&raw("Promo Banner", "Free"), "Toys", PAGE_URL),
        Err(Rejection::UnparseablePrice(_))
    ));
}

#[test]
fn parse_price_rejects_amounts_glued_to_a_phone_number() {
    assert!(matches!(
        parse_price("৳ 1,200 ৳ 950 Call 01712345678"),
        Err(Rejection::PriceOutOfRange(_))
    ));
}

#[test]
fn parse_price_accepts_largest_storable_amount() {
    assert_eq!(parse_price("9,999,999,999.99"), Ok(MAX_PRICE));
    assert!(matches!(
        parse_price("10,000,000,000"),
        Err(Rejection::PriceOutOfRange(_))
    ));
}

#[test]
fn normalize_rejects_oversized_price() {
    assert!(matches!(
        normalize(
            &raw("Baby Walker 3in1", "৳ 1,200 ৳ 950 Call 01712345678"),
            "Toys",
            PAGE_URL
        ),
        Err(Rejection::PriceOutOfRange(_))
    ));
}
