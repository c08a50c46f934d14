//! Bounded retry for fallible async calls against external services.
//!
//! The policy decides how many attempts are made and how long to wait between
//! them; the error type decides whether a failure is worth another attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Classifies failures into transient (retry) and permanent (give up now).
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Linear backoff: the wait after failed attempt `n` is `base_delay * n`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

/// Why a retried call ultimately failed.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt hit a retryable error; `last` is the final one.
    Exhausted { attempts: u32, last: E },
    /// A non-retryable error ended the loop early.
    Permanent(E),
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Wait applied after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Runs `op` until it succeeds, fails permanently, or the attempt budget is
    /// spent. `op` receives the 1-based attempt number. No wait follows the
    /// final attempt.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        E: Retryable + Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("{label}: attempt {attempt}/{max_attempts}");

            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(RetryError::Permanent(e)),
                Err(e) if attempt >= max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    })
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{label}: {e}. Retry {attempt}/{max_attempts} after {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
