//! Retry policies and the synchronous retry loop
//!
//! A [`RetryPolicy`] is a pure decision function: given how many retries have
//! already happened and how long the operation has been running, it says
//! whether another attempt is warranted. The background pipeline consults it
//! directly and re-enqueues without sleeping; the synchronous [`RetryLoop`]
//! additionally sleeps for [`RetryPolicy::backoff`] between attempts.
//!
//! Stock policies:
//! - [`RetryNTimes`] / [`RetryOneTime`]: a fixed number of retries
//! - [`RetryUntilElapsed`]: retry until a time budget is spent
//! - [`ExponentialBackoffRetry`]: bounded retries with exponential, jittered sleeps

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::KeeperResult;

/// Decides whether a failed operation may be attempted again.
pub trait RetryPolicy: Send + Sync + fmt::Debug {
    /// Whether another attempt is allowed.
    ///
    /// `retry_count` is the number of retries already performed (zero on the
    /// first failure) and `elapsed` is measured from the operation's original
    /// start, not from the previous attempt.
    fn allow_retry(&self, retry_count: u32, elapsed: Duration) -> bool;

    /// How long a synchronous caller should wait before retry number `retry_count`.
    fn backoff(&self, retry_count: u32) -> Duration {
        let _ = retry_count;
        Duration::ZERO
    }
}

/// Retry a fixed number of times with a constant sleep in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryNTimes {
    /// Maximum number of retries
    pub max_retries: u32,
    /// Sleep between attempts
    pub sleep_between: Duration,
}

impl RetryNTimes {
    /// Create a policy allowing `max_retries` retries
    #[must_use]
    pub fn new(max_retries: u32, sleep_between: Duration) -> Self {
        Self {
            max_retries,
            sleep_between,
        }
    }
}

impl RetryPolicy for RetryNTimes {
    fn allow_retry(&self, retry_count: u32, _elapsed: Duration) -> bool {
        retry_count < self.max_retries
    }

    fn backoff(&self, _retry_count: u32) -> Duration {
        self.sleep_between
    }
}

/// Retry exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryOneTime {
    /// Sleep before the single retry
    pub sleep_between: Duration,
}

impl RetryOneTime {
    /// Create the policy
    #[must_use]
    pub fn new(sleep_between: Duration) -> Self {
        Self { sleep_between }
    }
}

impl RetryPolicy for RetryOneTime {
    fn allow_retry(&self, retry_count: u32, _elapsed: Duration) -> bool {
        retry_count == 0
    }

    fn backoff(&self, _retry_count: u32) -> Duration {
        self.sleep_between
    }
}

/// Retry until the operation has been running for a given amount of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryUntilElapsed {
    /// Total time budget measured from the operation's start
    pub max_elapsed: Duration,
    /// Sleep between attempts
    pub sleep_between: Duration,
}

impl RetryUntilElapsed {
    /// Create the policy
    #[must_use]
    pub fn new(max_elapsed: Duration, sleep_between: Duration) -> Self {
        Self {
            max_elapsed,
            sleep_between,
        }
    }
}

impl RetryPolicy for RetryUntilElapsed {
    fn allow_retry(&self, _retry_count: u32, elapsed: Duration) -> bool {
        elapsed < self.max_elapsed
    }

    fn backoff(&self, _retry_count: u32) -> Duration {
        self.sleep_between
    }
}

/// Bounded retries with exponentially growing, jittered sleeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExponentialBackoffRetry {
    /// Sleep before the first retry
    pub base_sleep: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Upper bound for any single sleep
    pub max_sleep: Duration,
    /// Jitter factor (0.0 - 1.0) to avoid thundering herd
    pub jitter_factor: f64,
}

impl ExponentialBackoffRetry {
    /// Create a policy with the default cap (30s) and jitter (0.1)
    #[must_use]
    pub fn new(base_sleep: Duration, max_retries: u32) -> Self {
        Self {
            base_sleep,
            max_retries,
            max_sleep: Duration::from_secs(30),
            jitter_factor: 0.1,
        }
    }

    /// Set the upper bound for any single sleep
    #[must_use]
    pub fn with_max_sleep(mut self, max_sleep: Duration) -> Self {
        self.max_sleep = max_sleep;
        self
    }

    /// Set the jitter factor, clamped to `0.0..=1.0`
    #[must_use]
    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }
}

impl RetryPolicy for ExponentialBackoffRetry {
    fn allow_retry(&self, retry_count: u32, _elapsed: Duration) -> bool {
        retry_count < self.max_retries
    }

    fn backoff(&self, retry_count: u32) -> Duration {
        let delay_ms = self.base_sleep.as_millis() as f64 * 2f64.powi(retry_count.min(30) as i32);

        let jitter = 1.0 + (fastrand::f64() - 0.5) * 2.0 * self.jitter_factor;
        let capped_ms = (delay_ms * jitter).min(self.max_sleep.as_millis() as f64);

        Duration::from_millis(capped_ms.max(0.0) as u64)
    }
}

/// Synchronous retry primitive for blocking calls.
///
/// Runs an operation until it succeeds, fails with a non-retryable error, or
/// the policy refuses another attempt.
#[derive(Debug, Clone)]
pub struct RetryLoop {
    policy: Arc<dyn RetryPolicy>,
    retry_count: u32,
    started: Instant,
}

impl RetryLoop {
    /// Start a loop governed by `policy`
    #[must_use]
    pub fn new(policy: Arc<dyn RetryPolicy>) -> Self {
        Self {
            policy,
            retry_count: 0,
            started: Instant::now(),
        }
    }

    /// Number of retries performed so far
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Run `operation` to completion.
    pub fn call<T, F>(mut self, mut operation: F) -> KeeperResult<T>
    where
        F: FnMut() -> KeeperResult<T>,
    {
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() => {
                    let elapsed = self.started.elapsed();
                    if !self.policy.allow_retry(self.retry_count, elapsed) {
                        debug!(
                            "Retry policy gave up after {} retries ({:?}): {}",
                            self.retry_count, elapsed, error
                        );
                        return Err(error);
                    }
                    let delay = self.policy.backoff(self.retry_count);
                    self.retry_count += 1;
                    debug!(
                        "Retry-able error, attempt {} after {:?}: {}",
                        self.retry_count, delay, error
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }
}
