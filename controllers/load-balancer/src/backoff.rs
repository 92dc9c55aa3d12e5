//! # Exponential Backoff
//!
//! Bounded exponential backoff used when destroying Cloud IPs. A destroy can
//! race with an unmap that the API has accepted but not yet applied, so a
//! failed attempt is retried after a growing delay until the step budget runs
//! out. The loop blocks the calling task for the whole retry window.
//!
//! Default sequence: 1s, 1.2s, 1.44s, 1.728s between five attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry settings owned by the engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay after the first failed attempt
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failure
    pub factor: f64,
    /// Maximum number of attempts
    pub steps: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            factor: 1.2,
            steps: 5,
        }
    }
}

impl RetryPolicy {
    /// Fresh backoff sequence for one retry loop
    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.initial_delay, self.factor)
    }
}

/// Exponential backoff calculator
///
/// Each delay is the previous one multiplied by `factor`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current: Duration,
    factor: f64,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(initial: Duration, factor: f64) -> Self {
        Self {
            current: initial,
            factor,
        }
    }

    /// Get the next delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;
        // Rounded to whole nanoseconds so the sequence is exact
        let nanos = (self.current.as_nanos() as f64 * self.factor).round();
        self.current = Duration::from_nanos(nanos as u64);
        result
    }
}

/// Outcome of a failed attempt inside [`retry_with_backoff`]
#[derive(Debug)]
pub enum Attempt<E> {
    /// Worth trying again after a delay
    Transient(E),
    /// Give up immediately
    Fatal(E),
}

/// Run `operation` until it succeeds, fails fatally, or the policy's step
/// budget is spent. On exhaustion the last transient error is returned as is.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Attempt<E>>>,
    E: Display,
{
    let mut backoff = policy.backoff();
    let max_attempts = policy.steps.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(Attempt::Fatal(e)) => {
                debug!("{} failed on attempt {}: {}", operation_name, attempt, e);
                return Err(e);
            }
            Err(Attempt::Transient(e)) => {
                if attempt >= max_attempts {
                    warn!(
                        "{} still failing after {} attempts: {}",
                        operation_name, attempt, e
                    );
                    return Err(e);
                }
                let delay = backoff.next_backoff();
                debug!(
                    "{} attempt {} failed ({}), retrying in {:?}",
                    operation_name, attempt, e, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
