//! Crawl catalog: the category targets to visit and the selector chains used
//! to pull product cards out of each listing page.
//!
//! Both lists are configuration data loaded from YAML. The upstream storefront
//! has shipped several markup variants over time, so nothing here is assumed
//! to be authoritative beyond what the catalog file says.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const DEFAULT_MAX_PAGES: u32 = 50;
const DEFAULT_ANCHOR_DEPTH: usize = 5;

/// One crawlable section of the upstream catalog.
///
/// Page 1 lives at `base_url`; page `n > 1` at `{base_url}/page/{n}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTarget {
    pub label: String,
    pub base_url: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl CategoryTarget {
    /// Returns the listing URL for the 1-based `page` number.
    #[must_use]
    pub fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            return self.base_url.clone();
        }
        format!("{}/page/{page}/", self.base_url.trim_end_matches('/'))
    }
}

/// Ordered container strategies plus per-field selector fallbacks.
///
/// Every list is ranked: the first candidate that produces a non-empty value
/// wins, later candidates are progressively looser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionProfile {
    pub strategies: Vec<StrategyConfig>,
    pub name: Vec<String>,
    pub price: Vec<String>,
    pub image: ImageSource,
    #[serde(default)]
    pub link: Vec<String>,
}

/// How product cards are located on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// CSS selectors for card containers, tried in order until one of them
    /// yields at least one record.
    Containers { selectors: Vec<String> },
    /// Find leaf elements whose text carries a currency symbol and climb up to
    /// `max_depth` ancestors looking for a name and an image.
    PriceAnchor {
        currency_symbols: Vec<String>,
        #[serde(default = "default_anchor_depth")]
        max_depth: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    pub selectors: Vec<String>,
    /// Attributes read in order; lazy-loading themes keep the real URL in
    /// `data-src` and a placeholder in `src`.
    #[serde(default = "default_image_attributes")]
    pub attributes: Vec<String>,
}

impl Default for ExtractionProfile {
    fn default() -> Self {
        Self {
            strategies: vec![
                StrategyConfig::Containers {
                    selectors: strings(&[
                        ".product-small",
                        ".type-product",
                        "li.product",
                        ".product",
                        ".col-inner",
                    ]),
                },
                StrategyConfig::PriceAnchor {
                    currency_symbols: strings(&["৳", "Tk"]),
                    max_depth: DEFAULT_ANCHOR_DEPTH,
                },
            ],
            name: strings(&[
                ".name",
                ".woocommerce-loop-product__title",
                ".product-title",
                "h3",
                "h2",
                "a",
            ]),
            price: strings(&[
                ".price ins .amount bdi",
                ".price .amount bdi",
                ".price bdi",
                ".amount",
                ".price",
            ]),
            image: ImageSource {
                selectors: strings(&["img"]),
                attributes: default_image_attributes(),
            },
            link: strings(&["a.woocommerce-LoopProduct-link", "a[href]"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    pub categories: Vec<CategoryTarget>,
    #[serde(default)]
    pub extraction: ExtractionProfile,
}

impl CatalogFile {
    /// Finds a category by label, ignoring ASCII case.
    #[must_use]
    pub fn category(&self, label: &str) -> Option<&CategoryTarget> {
        self.categories
            .iter()
            .find(|c| c.label.eq_ignore_ascii_case(label.trim()))
    }
}

/// Load and validate the catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_catalog(&content)
}

/// Parse and validate catalog YAML already in memory.
///
/// # Errors
///
/// Returns [`ConfigError::CatalogParse`] for malformed YAML and
/// [`ConfigError::Validation`] for structurally valid but unusable content.
pub fn parse_catalog(content: &str) -> Result<CatalogFile, ConfigError> {
    let catalog: CatalogFile = serde_yaml::from_str(content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    if catalog.categories.is_empty() {
        return Err(ConfigError::Validation(
            "catalog must list at least one category".to_string(),
        ));
    }

    let mut seen_labels = HashSet::new();
    for category in &catalog.categories {
        let label = category.label.trim();
        if label.is_empty() {
            return Err(ConfigError::Validation(
                "category label must be non-empty".to_string(),
            ));
        }
        if !seen_labels.insert(label.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category label: '{label}'"
            )));
        }
        if category.max_pages == 0 {
            return Err(ConfigError::Validation(format!(
                "category '{label}' has max_pages 0; must be at least 1"
            )));
        }
        if !(category.base_url.starts_with("http://") || category.base_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "category '{label}' base_url must be http(s), got '{}'",
                category.base_url
            )));
        }
    }

    validate_profile(&catalog.extraction)
}

fn validate_profile(profile: &ExtractionProfile) -> Result<(), ConfigError> {
    if profile.strategies.is_empty() {
        return Err(ConfigError::Validation(
            "extraction.strategies must not be empty".to_string(),
        ));
    }
    for strategy in &profile.strategies {
        match strategy {
            StrategyConfig::Containers { selectors } if selectors.is_empty() => {
                return Err(ConfigError::Validation(
                    "containers strategy needs at least one selector".to_string(),
                ));
            }
            StrategyConfig::PriceAnchor {
                currency_symbols, ..
            } if currency_symbols.iter().all(|s| s.trim().is_empty()) => {
                return Err(ConfigError::Validation(
                    "price_anchor strategy needs at least one currency symbol".to_string(),
                ));
            }
            _ => {}
        }
    }

    for (field, list) in [
        ("name", &profile.name),
        ("price", &profile.price),
        ("image.selectors", &profile.image.selectors),
        ("image.attributes", &profile.image.attributes),
    ] {
        if list.is_empty() {
            return Err(ConfigError::Validation(format!(
                "extraction.{field} must not be empty"
            )));
        }
    }

    Ok(())
}

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

fn default_anchor_depth() -> usize {
    DEFAULT_ANCHOR_DEPTH
}

fn default_image_attributes() -> Vec<String> {
    strings(&["data-src", "data-lazy-src", "src"])
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
categories:
  - label: "Toys & Gaming"
    base_url: "https://shop.example/product-category/toys/"
    max_pages: 40
  - label: "Baby Care"
    base_url: "https://shop.example/product-category/baby-care/"
"#;

    fn target(base_url: &str) -> CategoryTarget {
        CategoryTarget {
            label: "Toys".to_string(),
            base_url: base_url.to_string(),
            max_pages: 10,
        }
    }

    #[test]
    fn page_one_is_the_base_url() {
        let t = target("https://shop.example/product-category/toys/");
        assert_eq!(t.page_url(1), "https://shop.example/product-category/toys/");
    }

    #[test]
    fn later_pages_append_page_segment() {
        let t = target("https://shop.example/product-category/toys/");
        assert_eq!(
            t.page_url(3),
            "https://shop.example/product-category/toys/page/3/"
        );
    }

    #[test]
    fn page_url_handles_base_without_trailing_slash() {
        let t = target("https://shop.example/shop");
        assert_eq!(t.page_url(2), "https://shop.example/shop/page/2/");
    }

    #[test]
    fn parses_minimal_catalog_with_default_profile() {
        let catalog = parse_catalog(MINIMAL).expect("catalog should parse");
        assert_eq!(catalog.categories.len(), 2);
        assert_eq!(catalog.categories[0].max_pages, 40);
        assert_eq!(catalog.categories[1].max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(catalog.extraction, ExtractionProfile::default());
    }

    #[test]
    fn category_lookup_ignores_case() {
        let catalog = parse_catalog(MINIMAL).unwrap();
        let found = catalog.category("baby care").expect("category should match");
        assert_eq!(found.label, "Baby Care");
        assert!(catalog.category("Footwear").is_none());
    }

    #[test]
    fn parses_custom_strategies() {
        let yaml = r#"
categories:
  - label: "Shop"
    base_url: "https://shop.example/shop/"
extraction:
  strategies:
    - kind: containers
      selectors: [".card"]
    - kind: price_anchor
      currency_symbols: ["$"]
  name: [".title"]
  price: [".cost"]
  image:
    selectors: ["img.main"]
"#;
        let catalog = parse_catalog(yaml).expect("catalog should parse");
        let profile = &catalog.extraction;
        assert_eq!(
            profile.strategies[0],
            StrategyConfig::Containers {
                selectors: vec![".card".to_string()]
            }
        );
        assert_eq!(
            profile.strategies[1],
            StrategyConfig::PriceAnchor {
                currency_symbols: vec!["$".to_string()],
                max_depth: DEFAULT_ANCHOR_DEPTH,
            }
        );
        assert_eq!(profile.image.attributes, default_image_attributes());
        assert!(profile.link.is_empty());
    }

    #[test]
    fn rejects_empty_category_list() {
        let err = parse_catalog("categories: []").unwrap_err();
        assert!(err.to_string().contains("at least one category"));
    }

    #[test]
    fn rejects_duplicate_labels_case_insensitively() {
        let yaml = r#"
categories:
  - label: "Toys"
    base_url: "https://shop.example/toys/"
  - label: "toys"
    base_url: "https://shop.example/toys-2/"
"#;
        let err = parse_catalog(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate category label"));
    }

    #[test]
    fn rejects_zero_max_pages() {
        let yaml = r#"
categories:
  - label: "Toys"
    base_url: "https://shop.example/toys/"
    max_pages: 0
"#;
        let err = parse_catalog(yaml).unwrap_err();
        assert!(err.to_string().contains("max_pages 0"));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let yaml = r#"
categories:
  - label: "Toys"
    base_url: "ftp://shop.example/toys/"
"#;
        let err = parse_catalog(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("http(s)")));
    }

    #[test]
    fn rejects_empty_name_selectors() {
        let yaml = r#"
categories:
  - label: "Toys"
    base_url: "https://shop.example/toys/"
extraction:
  strategies:
    - kind: containers
      selectors: [".card"]
  name: []
  price: [".price"]
  image:
    selectors: ["img"]
"#;
        let err = parse_catalog(yaml).unwrap_err();
        assert!(err.to_string().contains("extraction.name"));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = parse_catalog("categories: [").unwrap_err();
        assert!(matches!(err, ConfigError::CatalogParse(_)));
    }
    #[test]
    fn shipped_catalog_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/catalog.yaml");
        let catalog = load_catalog(&path).expect("shipped catalog should load");
        assert!(catalog.category("toys & gaming").is_some());
        assert_eq!(catalog.extraction, ExtractionProfile::default());
    }

    #[test]
    fn missing_catalog_file_is_an_io_error() {
        let err = load_catalog(Path::new("/nonexistent/catalog.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::CatalogIo { .. }));
    }
}
