//! Shared bounded-retry policy used by attempt resolution and guess
//! persistence.
//!
//! Every I/O retry in the engine goes through [`RetryPolicy`] so backoff
//! schedules live in one place and exhaustion is a distinguishable error
//! rather than a swallowed `None`.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

/// Error returned when every attempt allowed by a policy has failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{label}` failed after {attempts} attempts: {last}")]
pub struct Exhausted<E> {
    /// Name of the operation that was retried.
    pub label: &'static str,
    /// Total number of attempts made, including the first.
    pub attempts: usize,
    /// Error from the final attempt.
    pub last: E,
}

/// Bounded retry with an explicit backoff schedule.
///
/// A policy with `n` delays allows `n + 1` attempts; each delay is slept
/// through before the corresponding retry. Backoff timers are plain
/// [`sleep`] futures, so dropping the caller cancels any pending wait.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    schedule: Vec<Duration>,
}

impl RetryPolicy {
    /// Build a policy from an explicit backoff schedule.
    pub fn new(schedule: impl Into<Vec<Duration>>) -> Self {
        Self {
            schedule: schedule.into(),
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    /// Total number of attempts this policy allows.
    pub fn attempts(&self) -> usize {
        self.schedule.len() + 1
    }

    /// Run `operation` until it succeeds or the policy is exhausted.
    ///
    /// Intermediate failures are logged at `warn` with the attempt number;
    /// the final failure is wrapped in [`Exhausted`] so callers can tell
    /// "retried and gave up" apart from a first-try error.
    pub async fn run<T, E, F, Fut>(
        &self,
        label: &'static str,
        mut operation: F,
    ) -> Result<T, Exhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1usize;

        for delay in &self.schedule {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(%label, attempt, error = %err, "operation failed; retrying after backoff");
                    sleep(*delay).await;
                    attempt += 1;
                }
            }
        }

        operation().await.map_err(|last| Exhausted {
            label,
            attempts: attempt,
            last,
        })
    }
}
