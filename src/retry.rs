//! Retrying assertions with scaled timeouts
//!
//! Every check the suite makes against a deployed application is an
//! "eventually" assertion: the probe is re-run every poll interval until its
//! result satisfies a predicate or the (scaled) deadline passes.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Retry errors
#[derive(Error, Debug)]
pub enum RetryError {
    #[error("{what} not satisfied within {after:?} ({attempts} attempts); last observed: {}", .last.as_deref().unwrap_or("nothing"))]
    Timeout {
        what: String,
        after: Duration,
        attempts: u32,
        last: Option<String>,
    },
}

/// Multiplier applied to base timeouts to absorb environment-speed variance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeoutScale(f64);

impl TimeoutScale {
    /// Non-positive or non-finite factors fall back to 1.0.
    pub fn new(factor: f64) -> Self {
        if factor.is_finite() && factor > 0.0 {
            Self(factor)
        } else {
            Self(1.0)
        }
    }

    pub fn factor(&self) -> f64 {
        self.0
    }

    /// Scale a base duration
    pub fn apply(&self, base: Duration) -> Duration {
        base.mul_f64(self.0)
    }
}

impl Default for TimeoutScale {
    fn default() -> Self {
        Self(1.0)
    }
}

/// How long to keep trying, and how often
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Overall deadline, already scaled
    pub timeout: Duration,
    /// Delay between attempts
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

/// Re-run `probe` until `accept` holds for its output or `policy.timeout`
/// elapses.
///
/// Probe errors count as unsuccessful attempts. Each attempt is bounded by
/// the time left before the deadline, so a hung request cannot outlive the
/// policy. The probe always runs at least once.
///
/// # Example
///
/// ```no_run
/// use broker_smoke_tests::retry::{eventually, RetryPolicy};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let policy = RetryPolicy::new(Duration::from_secs(25), Duration::from_secs(4));
/// let body = eventually(
///     "ping",
///     &policy,
///     || async { Ok::<_, std::io::Error>("OK".to_string()) },
///     |body: &String| body.contains("OK"),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn eventually<T, E, F, Fut, P>(
    what: &str,
    policy: &RetryPolicy,
    mut probe: F,
    mut accept: P,
) -> Result<T, RetryError>
where
    T: Debug,
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&T) -> bool,
{
    let started = Instant::now();
    let deadline = started + policy.timeout;
    let mut attempts = 0u32;
    let mut last = None;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if attempts > 0 && remaining.is_zero() {
            break;
        }
        attempts += 1;

        match tokio::time::timeout(remaining, probe()).await {
            Ok(Ok(value)) if accept(&value) => {
                tracing::debug!(what, attempts, "assertion satisfied");
                return Ok(value);
            }
            Ok(Ok(value)) => last = Some(format!("{:?}", value)),
            Ok(Err(e)) => last = Some(e.to_string()),
            Err(_) => last = Some("attempt cut off at deadline".to_string()),
        }
        tracing::debug!(what, attempts, last = ?last, "assertion not yet satisfied");

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        tokio::time::sleep(policy.interval.min(deadline - now)).await;
    }

    Err(RetryError::Timeout {
        what: what.to_string(),
        after: started.elapsed(),
        attempts,
        last,
    })
}
