//! Bounded retry with linear backoff for page fetches.
//!
//! Retries are drawn from an explicit [`RetryBudget`]. The crawl either hands
//! every site a fresh budget ([`BudgetScope::PerSite`], the default) or
//! threads a single budget through the whole run ([`BudgetScope::Shared`]).
//! With a shared budget, a flaky site early in the list can use up all the
//! retries and later failing sites get none.
//!
//! # Backoff
//!
//! The n-th retry taken from a budget sleeps `base_delay * n` before the
//! request is resubmitted. With the defaults this is 1s, 2s, 3s.

use crate::scrapers::{FetchError, PageSource};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Who a retry budget belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetScope {
    /// Each site starts with a full budget.
    PerSite,
    /// One budget for the whole run.
    Shared,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries available per budget (not counting the first attempt).
    pub max_retries: u32,
    /// Delay unit; the n-th retry waits `n` of these.
    pub base_delay: Duration,
    pub scope: BudgetScope,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            scope: BudgetScope::PerSite,
        }
    }
}

impl RetryPolicy {
    /// A fresh, unused budget sized by this policy.
    pub fn budget(&self) -> RetryBudget {
        RetryBudget::new(self.max_retries)
    }

    /// Sleep before the `retry`-th retry (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(retry)
    }
}

/// Counter of retries spent against a fixed ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryBudget {
    used: u32,
    max: u32,
}

impl RetryBudget {
    pub fn new(max: u32) -> Self {
        Self { used: 0, max }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max
    }

    /// Spend one retry, returning its 1-based number, or `None` once the ceiling is reached.
    pub fn try_take(&mut self) -> Option<u32> {
        if self.used < self.max {
            self.used += 1;
            Some(self.used)
        } else {
            None
        }
    }
}

/// Fetch `url` from `source`, retrying retryable failures while `budget` allows.
///
/// Non-retryable errors (bad URL, forbidden domain) return immediately without
/// touching the budget. Once the budget is exhausted the last error is returned.
#[instrument(level = "info", skip(source, policy, budget), fields(used = budget.used()))]
pub async fn fetch_with_retry<S: PageSource>(
    source: &S,
    url: &str,
    policy: &RetryPolicy,
    budget: &mut RetryBudget,
) -> Result<String, FetchError> {
    let total_t0 = Instant::now();

    loop {
        let err = match source.get(url).await {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };

        if !err.is_retryable() {
            return Err(err);
        }

        match budget.try_take() {
            Some(retry) => {
                let delay = policy.delay_for(retry);
                warn!(
                    retry,
                    max = policy.max_retries,
                    ?delay,
                    error = %err,
                    "fetch failed; backing off"
                );
                sleep(delay).await;
            }
            None => {
                error!(
                    max = policy.max_retries,
                    elapsed_ms_total = total_t0.elapsed().as_millis(),
                    error = %err,
                    "fetch exhausted retries"
                );
                return Err(err);
            }
        }
    }
}
