//! Page Extractor: turns listing-page HTML into raw product records.
//!
//! Card discovery walks an ordered list of strategies and each field is read
//! through its own ranked selector chain. The first candidate that yields a
//! usable value wins, so new markup variants are handled by adding entries to
//! the catalog profile rather than by touching this code.

use std::collections::HashSet;

use mindtoys_core::{ExtractionProfile, StrategyConfig};
use scraper::{ElementRef, Html, Selector};

use crate::error::ScraperError;
use crate::types::RawRecord;

/// A ranked list of compiled CSS selectors.
#[derive(Debug, Clone)]
pub struct SelectorChain {
    entries: Vec<(String, Selector)>,
}

impl SelectorChain {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] for the first entry that is
    /// not valid CSS.
    pub fn compile(selectors: &[String]) -> Result<Self, ScraperError> {
        let entries = selectors
            .iter()
            .map(|raw| {
                Selector::parse(raw)
                    .map(|sel| (raw.clone(), sel))
                    .map_err(|e| ScraperError::InvalidSelector {
                        selector: raw.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Text of the first descendant of `scope` with non-blank text.
    fn first_text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.entries.iter().find_map(|(_, sel)| {
            scope
                .select(sel)
                .map(element_text)
                .find(|text| !text.is_empty())
        })
    }

    fn elements<'a>(&'a self, scope: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.entries
            .iter()
            .flat_map(move |(_, sel)| scope.select(sel))
    }
}

enum Strategy {
    Containers(Vec<(String, Selector)>),
    PriceAnchor {
        currency_symbols: Vec<String>,
        max_depth: usize,
    },
}

impl Strategy {
    fn label(&self) -> &'static str {
        match self {
            Self::Containers(_) => "containers",
            Self::PriceAnchor { .. } => "price_anchor",
        }
    }
}

/// Compiled form of an [`ExtractionProfile`]. Build once per run and reuse
/// for every page.
pub struct Extractor {
    strategies: Vec<Strategy>,
    name: SelectorChain,
    price: SelectorChain,
    image: SelectorChain,
    image_attributes: Vec<String>,
    link: SelectorChain,
}

impl Extractor {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] if any selector in the
    /// profile fails to parse.
    pub fn from_profile(profile: &ExtractionProfile) -> Result<Self, ScraperError> {
        let strategies = profile
            .strategies
            .iter()
            .map(|config| match config {
                StrategyConfig::Containers { selectors } => {
                    SelectorChain::compile(selectors).map(|chain| Strategy::Containers(chain.entries))
                }
                StrategyConfig::PriceAnchor {
                    currency_symbols,
                    max_depth,
                } => Ok(Strategy::PriceAnchor {
                    currency_symbols: currency_symbols
                        .iter()
                        .map(|s| s.trim().to_owned())
                        .filter(|s| !s.is_empty())
                        .collect(),
                    max_depth: *max_depth,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            strategies,
            name: SelectorChain::compile(&profile.name)?,
            price: SelectorChain::compile(&profile.price)?,
            image: SelectorChain::compile(&profile.image.selectors)?,
            image_attributes: profile.image.attributes.clone(),
            link: SelectorChain::compile(&profile.link)?,
        })
    }

    /// Parses `html` and extracts every product card on it.
    ///
    /// `page_url` is the base for resolving relative image and link URLs.
    #[must_use]
    pub fn extract(&self, html: &str, page_url: &str) -> Vec<RawRecord> {
        let document = Html::parse_document(html);
        self.extract_document(&document, page_url)
    }

    /// Runs the strategy chain over an already parsed document.
    ///
    /// Records whose raw name repeats an earlier one on the same page are
    /// dropped; the first occurrence wins.
    #[must_use]
    pub fn extract_document(&self, document: &Html, page_url: &str) -> Vec<RawRecord> {
        let base = reqwest::Url::parse(page_url).ok();

        for strategy in &self.strategies {
            let records = match strategy {
                Strategy::Containers(selectors) => {
                    self.extract_containers(document, selectors, base.as_ref())
                }
                Strategy::PriceAnchor {
                    currency_symbols,
                    max_depth,
                } => self.extract_price_anchors(
                    document,
                    currency_symbols,
                    *max_depth,
                    base.as_ref(),
                ),
            };
            if !records.is_empty() {
                tracing::debug!(
                    strategy = strategy.label(),
                    records = records.len(),
                    page_url,
                    "extraction strategy matched"
                );
                return collapse_duplicate_names(records);
            }
            tracing::debug!(strategy = strategy.label(), page_url, "strategy found nothing");
        }

        Vec::new()
    }

    fn extract_containers(
        &self,
        document: &Html,
        selectors: &[(String, Selector)],
        base: Option<&reqwest::Url>,
    ) -> Vec<RawRecord> {
        for (raw, selector) in selectors {
            let records: Vec<RawRecord> = document
                .select(selector)
                .filter_map(|card| self.read_card(card, None, base))
                .collect();
            if !records.is_empty() {
                tracing::debug!(selector = raw.as_str(), "container selector matched");
                return records;
            }
        }
        Vec::new()
    }

    fn extract_price_anchors(
        &self,
        document: &Html,
        currency_symbols: &[String],
        max_depth: usize,
        base: Option<&reqwest::Url>,
    ) -> Vec<RawRecord> {
        if currency_symbols.is_empty() {
            return Vec::new();
        }

        let mut seen_cards = HashSet::new();
        let mut records = Vec::new();

        let anchors = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| !el.children().any(|c| c.value().is_element()))
            .filter(|el| {
                let text = element_text(*el);
                currency_symbols.iter().any(|sym| text.contains(sym.as_str()))
            });

        for anchor in anchors {
            let card = anchor
                .ancestors()
                .filter_map(ElementRef::wrap)
                .take(max_depth)
                .find(|candidate| {
                    self.name.first_text(*candidate).is_some()
                        && self.first_image(*candidate, base).is_some()
                });
            let Some(card) = card else {
                continue;
            };
            if !seen_cards.insert(card.id()) {
                continue;
            }
            if let Some(record) = self.read_card(card, Some(element_text(anchor)), base) {
                records.push(record);
            }
        }

        records
    }

    /// Reads one card. Returns `None` when the name or image is missing;
    /// price text may be empty and is judged later by the normalizer.
    fn read_card(
        &self,
        card: ElementRef<'_>,
        anchor_price: Option<String>,
        base: Option<&reqwest::Url>,
    ) -> Option<RawRecord> {
        let name_text = self.name.first_text(card)?;
        let image_ref = self.first_image(card, base)?;
        let price_text = self
            .price
            .first_text(card)
            .or(anchor_price)
            .unwrap_or_default();
        let link = self.first_link(card, base);

        Some(RawRecord {
            name_text,
            price_text,
            image_ref,
            link,
        })
    }

    fn first_image(&self, card: ElementRef<'_>, base: Option<&reqwest::Url>) -> Option<String> {
        self.image.elements(card).find_map(|img| {
            self.image_attributes.iter().find_map(|attr| {
                let value = img.value().attr(attr)?.trim();
                if value.is_empty() || value.starts_with("data:") {
                    return None;
                }
                resolve_url(base, value)
            })
        })
    }

    fn first_link(&self, card: ElementRef<'_>, base: Option<&reqwest::Url>) -> Option<String> {
        if card.value().name() == "a" {
            if let Some(href) = card.value().attr("href") {
                return resolve_url(base, href.trim());
            }
        }
        self.link.elements(card).find_map(|a| {
            let href = a.value().attr("href")?.trim();
            if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                return None;
            }
            resolve_url(base, href)
        })
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_url(base: Option<&reqwest::Url>, candidate: &str) -> Option<String> {
    match base {
        Some(base) => base.join(candidate).ok().map(|u| u.to_string()),
        None => reqwest::Url::parse(candidate).ok().map(|u| u.to_string()),
    }
}

fn collapse_duplicate_names(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.name_text.clone()))
        .collect()
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
