//! Scroll-to-bottom routine that forces lazy-loaded cards and images into the
//! DOM before extraction.
//!
//! The loop is written against [`Scrollable`] rather than a concrete browser
//! page so it runs identically in tests.

use std::future::Future;
use std::time::Duration;

use mindtoys_core::AppConfig;

use crate::error::ScraperError;

/// A viewport that can be scrolled and measured.
pub trait Scrollable: Send {
    fn scroll_by(&mut self, px: u32) -> impl Future<Output = Result<(), ScraperError>> + Send;

    /// Current total scrollable height of the document in pixels.
    fn scroll_height(&mut self) -> impl Future<Output = Result<u64, ScraperError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoscrollPolicy {
    pub step_px: u32,
    pub interval: Duration,
    /// Hard limit on the total distance scrolled.
    pub ceiling_px: u32,
    /// Distance from the bottom that already counts as "at the bottom".
    pub bottom_margin_px: u32,
}

impl Default for AutoscrollPolicy {
    fn default() -> Self {
        Self {
            step_px: 100,
            interval: Duration::from_millis(40),
            ceiling_px: 30_000,
            bottom_margin_px: 200,
        }
    }
}

impl AutoscrollPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            step_px: config.scraper_scroll_step_px,
            interval: Duration::from_millis(config.scraper_scroll_interval_ms),
            ceiling_px: config.scraper_scroll_ceiling_px,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoscrollOutcome {
    pub travelled_px: u64,
    pub final_height: u64,
    pub hit_ceiling: bool,
}

/// Scrolls `target` in `step_px` increments until the bottom is reached and
/// the document height has stopped growing, or the ceiling is hit.
///
/// # Errors
///
/// Propagates the first error from `target`.
pub async fn autoscroll<S: Scrollable>(
    target: &mut S,
    policy: &AutoscrollPolicy,
) -> Result<AutoscrollOutcome, ScraperError> {
    let step = policy.step_px.max(1);
    let ceiling = u64::from(policy.ceiling_px);
    let margin = u64::from(policy.bottom_margin_px);

    let mut travelled = 0u64;
    let mut last_height = target.scroll_height().await?;

    while travelled < ceiling {
        target.scroll_by(step).await?;
        tokio::time::sleep(policy.interval).await;
        travelled += u64::from(step);

        let height = target.scroll_height().await?;
        let grew = height > last_height;
        last_height = height;

        if travelled + margin >= height && !grew {
            return Ok(AutoscrollOutcome {
                travelled_px: travelled,
                final_height: height,
                hit_ceiling: false,
            });
        }
    }

    tracing::debug!(travelled, ceiling, "autoscroll stopped at ceiling");
    Ok(AutoscrollOutcome {
        travelled_px: travelled,
        final_height: last_height,
        hit_ceiling: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fake page whose height grows by `growth` each time the viewport comes
    /// within `trigger` px of the bottom, up to `max_loads` times.
    struct FakePage {
        position: u64,
        height: u64,
        growth: u64,
        trigger: u64,
        loads_left: u32,
        scroll_calls: u32,
    }

    impl FakePage {
        fn fixed(height: u64) -> Self {
            Self {
                position: 0,
                height,
                growth: 0,
                trigger: 0,
                loads_left: 0,
                scroll_calls: 0,
            }
        }
    }

    impl Scrollable for FakePage {
        async fn scroll_by(&mut self, px: u32) -> Result<(), ScraperError> {
            self.scroll_calls += 1;
            self.position += u64::from(px);
            if self.loads_left > 0 && self.position + self.trigger >= self.height {
                self.height += self.growth;
                self.loads_left -= 1;
            }
            Ok(())
        }

        async fn scroll_height(&mut self) -> Result<u64, ScraperError> {
            Ok(self.height)
        }
    }

    fn policy(step_px: u32, ceiling_px: u32) -> AutoscrollPolicy {
        AutoscrollPolicy {
            step_px,
            interval: Duration::ZERO,
            ceiling_px,
            bottom_margin_px: 200,
        }
    }

    #[tokio::test]
    async fn stops_near_bottom_of_static_page() {
        let mut page = FakePage::fixed(1_000);
        let outcome = autoscroll(&mut page, &policy(100, 30_000)).await.unwrap();
        assert_eq!(outcome.travelled_px, 800);
        assert_eq!(outcome.final_height, 1_000);
        assert!(!outcome.hit_ceiling);
        assert_eq!(page.scroll_calls, 8);
    }

    #[tokio::test]
    async fn keeps_scrolling_while_content_loads() {
        let mut page = FakePage {
            position: 0,
            height: 1_000,
            growth: 1_000,
            trigger: 200,
            loads_left: 2,
            scroll_calls: 0,
        };
        let outcome = autoscroll(&mut page, &policy(100, 30_000)).await.unwrap();
        assert_eq!(outcome.final_height, 3_000);
        assert!(outcome.travelled_px + 200 >= 3_000);
        assert!(!outcome.hit_ceiling);
    }

    #[tokio::test]
    async fn ceiling_bounds_an_endless_page() {
        let mut page = FakePage {
            position: 0,
            height: 500,
            growth: 500,
            trigger: 200,
            loads_left: u32::MAX,
            scroll_calls: 0,
        };
        let outcome = autoscroll(&mut page, &policy(100, 2_000)).await.unwrap();
        assert!(outcome.hit_ceiling);
        assert_eq!(outcome.travelled_px, 2_000);
        assert_eq!(page.scroll_calls, 20);
    }

    #[tokio::test]
    async fn short_page_takes_a_single_step() {
        let mut page = FakePage::fixed(150);
        let outcome = autoscroll(&mut page, &policy(100, 30_000)).await.unwrap();
        assert_eq!(outcome.travelled_px, 100);
        assert_eq!(page.scroll_calls, 1);
    }

    #[test]
    fn default_policy_matches_documented_values() {
        let p = AutoscrollPolicy::default();
        assert_eq!(p.step_px, 100);
        assert_eq!(p.ceiling_px, 30_000);
        assert_eq!(p.bottom_margin_px, 200);
    }
}
