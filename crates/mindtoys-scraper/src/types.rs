/// Text pulled out of one product card before any cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub name_text: String,
    pub price_text: String,
    /// Absolute image URL, already resolved against the page URL.
    pub image_ref: String,
    /// Absolute product link when the card carries one.
    pub link: Option<String>,
}

/// Outcome of a single navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Ok,
    /// Upstream answered 404: the category has no more pages.
    NotFound,
    Timeout,
    OtherError,
}

impl PageStatus {
    /// `Timeout` and `OtherError` are skipped; the crawl continues with the
    /// next page number.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Timeout | Self::OtherError)
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
            Self::OtherError => "other_error",
        };
        f.write_str(s)
    }
}

/// What a page session hands back for one URL.
#[derive(Debug, Clone)]
pub struct PageFetch {
    pub status: PageStatus,
    /// Page HTML; empty unless `status` is `Ok`.
    pub html: String,
    /// Human-readable failure cause for logging.
    pub detail: Option<String>,
}

impl PageFetch {
    #[must_use]
    pub fn ok(html: String) -> Self {
        Self {
            status: PageStatus::Ok,
            html,
            detail: None,
        }
    }

    #[must_use]
    pub fn failed(status: PageStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            html: String::new(),
            detail: Some(detail.into()),
        }
    }
}

/// A page visit after extraction: its status plus every raw record found.
#[derive(Debug, Clone)]
pub struct PageFetchResult {
    pub status: PageStatus,
    /// Always empty unless `status` is `Ok`.
    pub records: Vec<RawRecord>,
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_and_other_errors_are_transient() {
        assert!(PageStatus::Timeout.is_transient());
        assert!(PageStatus::OtherError.is_transient());
        assert!(!PageStatus::Ok.is_transient());
        assert!(!PageStatus::NotFound.is_transient());
    }

    #[test]
    fn failed_fetch_carries_no_html() {
        let fetch = PageFetch::failed(PageStatus::NotFound, "404 for https://shop.example/");
        assert!(fetch.html.is_empty());
        assert_eq!(fetch.status.to_string(), "not_found");
    }
}
