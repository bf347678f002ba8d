//! Retry and polling helpers
//!
//! Backoff schedules are pure values: [`Backoff::delay_for`] maps an attempt
//! number to a delay and knows nothing about timers. [`retry_with_policy`] and
//! [`poll_until`] drive a schedule on tokio timers.
//!
//! **Schedules used by the bridge:**
//! - Apply step: linear, `retry_delay_ms * attempt` (500ms, 1000ms, ...)
//! - Capability resolution: linear spacing, 100ms then 150ms
//! - Hydration wait: exponential from 50ms, ×1.5, capped at 200ms

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Delay schedule between attempts
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Same delay after every attempt
    Constant(Duration),
    /// `base + step * (attempt - 1)`
    Linear { base: Duration, step: Duration },
    /// `initial * factor^(attempt - 1)`, never above `cap`
    Exponential {
        initial: Duration,
        factor: f64,
        cap: Duration,
    },
}

impl Backoff {
    /// `base * attempt` (500ms, 1000ms, 1500ms for base 500ms)
    pub fn linear(base: Duration) -> Self {
        Backoff::Linear { base, step: base }
    }

    /// Delay to wait after `attempt` (1-based) failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let n = attempt.max(1) - 1;
        match self {
            Backoff::Constant(delay) => *delay,
            Backoff::Linear { base, step } => base.saturating_add(step.saturating_mul(n)),
            Backoff::Exponential {
                initial,
                factor,
                cap,
            } => {
                let scaled = initial.as_nanos() as f64 * factor.powi(n.min(i32::MAX as u32) as i32);
                if !scaled.is_finite() || scaled >= cap.as_nanos() as f64 {
                    *cap
                } else {
                    Duration::from_nanos(scaled.max(0.0) as u64)
                }
            }
        }
    }
}

/// Attempt ceiling plus schedule
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first (at least 1)
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// Result of a retried operation plus the attempts it took
#[derive(Debug)]
pub struct RetryReport<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

impl<T, E> RetryReport<T, E> {
    /// Attempts beyond the first
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Run `operation` until it succeeds or the policy's attempts are exhausted
///
/// `operation` receives the 1-based attempt number. Every error is retried;
/// the last error is returned once attempts run out.
pub async fn retry_with_policy<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> RetryReport<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Operation succeeded after retry"
                    );
                }
                return RetryReport {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) => {
                if attempt >= max_attempts {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Operation failed: attempts exhausted"
                    );
                    return RetryReport {
                        result: Err(err),
                        attempts: attempt,
                    };
                }

                let delay = policy.backoff.delay_for(attempt);
                tracing::debug!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "Operation failed, will retry after backoff"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Poll `check` until it returns true or `max_wait` elapses
///
/// The last sleep is shortened so the total wait never exceeds `max_wait`;
/// `check` is always evaluated once more at the deadline.
pub async fn poll_until<F>(
    operation_name: &str,
    max_wait: Duration,
    backoff: &Backoff,
    mut check: F,
) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    let deadline = start + max_wait;
    let mut attempt = 0;

    loop {
        attempt += 1;

        if check() {
            tracing::debug!(
                operation = operation_name,
                attempt,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Poll condition met"
            );
            return true;
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::debug!(
                operation = operation_name,
                attempt,
                max_wait_ms = max_wait.as_millis() as u64,
                "Poll timed out"
            );
            return false;
        }

        let delay = backoff.delay_for(attempt).min(deadline - now);
        tokio::time::sleep(delay).await;
    }
}
