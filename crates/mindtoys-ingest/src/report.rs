//! Per-category and per-run crawl summaries.

use std::fmt;

/// Why a category stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryOutcome {
    /// Upstream returned 404 for `page`: past the last real page.
    Exhausted { page: u32 },
    /// Too many consecutive pages came back without a single card.
    EmptyPages { page: u32 },
    /// `max_pages` was reached.
    PageCap { page: u32 },
    /// The store rejected a write; remaining pages were abandoned.
    StoreFailed { page: u32 },
    /// A page session could not be opened for this category.
    SessionFailed,
    /// Cancellation was requested before `page` was fetched.
    Cancelled { page: u32 },
}

impl CategoryOutcome {
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::StoreFailed { .. } | Self::SessionFailed)
    }
}

impl fmt::Display for CategoryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { page } => write!(f, "exhausted (404 at page {page})"),
            Self::EmptyPages { page } => write!(f, "empty pages (stopped after page {page})"),
            Self::PageCap { page } => write!(f, "page cap ({page})"),
            Self::StoreFailed { page } => write!(f, "store failure at page {page}"),
            Self::SessionFailed => write!(f, "session failed"),
            Self::Cancelled { page } => write!(f, "cancelled before page {page}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    pub label: String,
    pub outcome: CategoryOutcome,
    /// Pages that loaded successfully (status OK).
    pub pages_fetched: u32,
    /// Pages skipped after a timeout or other transient failure.
    pub pages_failed: u32,
    pub records_extracted: u64,
    pub inserted: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub error: Option<String>,
}

impl CategoryReport {
    pub(crate) fn new(label: &str, outcome: CategoryOutcome) -> Self {
        Self {
            label: label.to_owned(),
            outcome,
            pages_fetched: 0,
            pages_failed: 0,
            records_extracted: 0,
            inserted: 0,
            skipped: 0,
            rejected: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub pages_fetched: u64,
    pub pages_failed: u64,
    pub inserted: u64,
    pub skipped: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub categories: Vec<CategoryReport>,
    /// Rows removed by the replace-all clear at run start.
    pub cleared: u64,
}

impl RunReport {
    #[must_use]
    pub fn totals(&self) -> RunTotals {
        self.categories
            .iter()
            .fold(RunTotals::default(), |mut acc, c| {
                acc.pages_fetched += u64::from(c.pages_fetched);
                acc.pages_failed += u64::from(c.pages_failed);
                acc.inserted += c.inserted;
                acc.skipped += c.skipped;
                acc.rejected += c.rejected;
                acc
            })
    }

    #[must_use]
    pub fn failed_categories(&self) -> usize {
        self.categories
            .iter()
            .filter(|c| c.outcome.is_failure())
            .count()
    }

    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.categories
            .iter()
            .any(|c| matches!(c.outcome, CategoryOutcome::Cancelled { .. }))
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<28} {:>6} {:>6} {:>8} {:>8} {:>8}  outcome",
            "category", "pages", "failed", "inserted", "skipped", "rejected"
        )?;
        for c in &self.categories {
            writeln!(
                f,
                "{:<28} {:>6} {:>6} {:>8} {:>8} {:>8}  {}",
                c.label, c.pages_fetched, c.pages_failed, c.inserted, c.skipped, c.rejected, c.outcome
            )?;
        }
        let t = self.totals();
        write!(
            f,
            "{:<28} {:>6} {:>6} {:>8} {:>8} {:>8}",
            "TOTAL", t.pages_fetched, t.pages_failed, t.inserted, t.skipped, t.rejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(label: &str, outcome: CategoryOutcome, inserted: u64) -> CategoryReport {
        CategoryReport {
            pages_fetched: 3,
            inserted,
            skipped: 1,
            rejected: 2,
            ..CategoryReport::new(label, outcome)
        }
    }

    #[test]
    fn totals_sum_every_category() {
        let run = RunReport {
            categories: vec![
                report("Toys", CategoryOutcome::Exhausted { page: 4 }, 10),
                report("Baby Care", CategoryOutcome::PageCap { page: 3 }, 5),
            ],
            cleared: 0,
        };
        let t = run.totals();
        assert_eq!(t.pages_fetched, 6);
        assert_eq!(t.inserted, 15);
        assert_eq!(t.skipped, 2);
        assert_eq!(t.rejected, 4);
    }

    #[test]
    fn failures_and_cancellation_are_detected() {
        let run = RunReport {
            categories: vec![
                report("Toys", CategoryOutcome::StoreFailed { page: 2 }, 0),
                report("Baby Care", CategoryOutcome::Cancelled { page: 1 }, 0),
            ],
            cleared: 0,
        };
        assert_eq!(run.failed_categories(), 1);
        assert!(run.was_cancelled());
    }

    #[test]
    fn summary_lists_categories_and_total() {
        let run = RunReport {
            categories: vec![report("Toys", CategoryOutcome::Exhausted { page: 4 }, 10)],
            cleared: 0,
        };
        let text = run.to_string();
        assert!(text.contains("Toys"));
        assert!(text.contains("exhausted (404 at page 4)"));
        assert!(text.lines().last().unwrap().starts_with("TOTAL"));
    }
}
