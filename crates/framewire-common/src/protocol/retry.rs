//! Retry policy for transient read/write failures.
//!
//! A [`RetryPolicy`] is an immutable value supplied by the caller. Each
//! `send`/`receive` call turns it into a [`RetryBudget`] that owns the
//! attempt counter for that call only, so a policy can be reused freely
//! across calls and threads.
//!
//! Passing `None` instead of a policy disables retries entirely. A policy with
//! a zero count behaves the same in practice but stays distinguishable in the
//! type.

use std::time::Duration;

/// Backoff used when a policy's interval is zero.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Caller-supplied retry budget.
///
/// # Example
///
/// ```
/// use framewire_common::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(20));
/// assert_eq!(policy.effective_interval(), Duration::from_millis(20));
///
/// // A zero interval falls back to the 100ms default.
/// let policy = RetryPolicy::default().with_count(1);
/// assert_eq!(policy.effective_interval(), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Number of retries allowed after the first failed attempt
    pub count: u32,
    /// Sleep between attempts; zero means [`DEFAULT_RETRY_INTERVAL`]
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(count: u32, interval: Duration) -> Self {
        Self { count, interval }
    }

    /// Builds a policy from the millisecond form used on the command line.
    pub fn from_millis(count: u32, interval_ms: u64) -> Self {
        Self::new(count, Duration::from_millis(interval_ms))
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// The sleep actually applied before a retry.
    ///
    /// This is the only place the default interval is resolved.
    pub fn effective_interval(&self) -> Duration {
        if self.interval.is_zero() {
            DEFAULT_RETRY_INTERVAL
        } else {
            self.interval
        }
    }
}

/// Per-call retry state derived from an optional [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryBudget {
    policy: Option<RetryPolicy>,
    used: u32,
}

impl RetryBudget {
    pub fn new(policy: Option<RetryPolicy>) -> Self {
        Self { policy, used: 0 }
    }

    /// Consumes one retry, returning the backoff to sleep before it.
    ///
    /// Returns `None` when no policy was supplied or the budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        let policy = self.policy?;
        if self.used >= policy.count {
            return None;
        }
        self.used += 1;
        Some(policy.effective_interval())
    }

    /// Retries consumed so far.
    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn is_enabled(&self) -> bool {
        self.policy.is_some()
    }
}
