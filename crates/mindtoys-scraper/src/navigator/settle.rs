//! Waits for a freshly loaded page's network traffic to go quiet.
//!
//! The load event fires before a storefront's deferred requests (lazy card
//! fragments, price widgets) finish. A page counts as settled once no new
//! request has completed for `quiet_polls` consecutive polls. The caller
//! bounds the wait with its navigation timeout.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// A page whose completed network requests can be counted.
pub trait NetworkActivity: Send {
    /// Number of requests that have finished since navigation started.
    fn finished_requests(&mut self) -> impl Future<Output = Result<u64, ScraperError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub poll_interval: Duration,
    /// Consecutive unchanged polls that count as idle.
    pub quiet_polls: u32,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            quiet_polls: 5,
        }
    }
}

/// Polls `page` until its finished-request count holds steady for
/// `policy.quiet_polls` polls. Returns the final count.
///
/// # Errors
///
/// Propagates the first error from `page`.
pub async fn wait_for_network_idle<N: NetworkActivity>(
    page: &mut N,
    policy: &SettlePolicy,
) -> Result<u64, ScraperError> {
    let mut last = page.finished_requests().await?;
    let mut quiet = 0u32;

    while quiet < policy.quiet_polls {
        tokio::time::sleep(policy.poll_interval).await;
        let count = page.finished_requests().await?;
        if count == last {
            quiet += 1;
        } else {
            last = count;
            quiet = 0;
        }
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed sequence of counts, repeating the last one forever.
    struct Replay {
        counts: Vec<u64>,
        polls: usize,
    }

    impl NetworkActivity for Replay {
        async fn finished_requests(&mut self) -> Result<u64, ScraperError> {
            let i = self.polls.min(self.counts.len() - 1);
            self.polls += 1;
            Ok(self.counts[i])
        }
    }

    struct Broken;

    impl NetworkActivity for Broken {
        async fn finished_requests(&mut self) -> Result<u64, ScraperError> {
            Err(ScraperError::Timeout {
                url: "https://shop.example/".to_owned(),
                timeout_secs: 1,
            })
        }
    }

    fn policy(quiet_polls: u32) -> SettlePolicy {
        SettlePolicy {
            poll_interval: Duration::ZERO,
            quiet_polls,
        }
    }

    #[tokio::test]
    async fn idle_page_settles_after_quiet_window() {
        let mut page = Replay {
            counts: vec![12],
            polls: 0,
        };
        assert_eq!(wait_for_network_idle(&mut page, &policy(3)).await.unwrap(), 12);
        assert_eq!(page.polls, 4);
    }

    #[tokio::test]
    async fn late_requests_restart_the_quiet_window() {
        let mut page = Replay {
            counts: vec![3, 3, 7, 7, 9, 9, 9, 9],
            polls: 0,
        };
        assert_eq!(wait_for_network_idle(&mut page, &policy(3)).await.unwrap(), 9);
        assert_eq!(page.polls, 8);
    }

    #[tokio::test]
    async fn errors_propagate() {
        let err = wait_for_network_idle(&mut Broken, &policy(3)).await.unwrap_err();
        assert!(matches!(err, ScraperError::Timeout { .. }));
    }

    #[test]
    fn default_policy_waits_half_a_second() {
        let p = SettlePolicy::default();
        assert_eq!(p.poll_interval * p.quiet_polls, Duration::from_millis(500));
    }
}
