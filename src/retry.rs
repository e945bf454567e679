//! Bounded retry with exponential backoff.
//!
//! One policy serves hardware bring-up and radio transmission: a fixed attempt
//! ceiling and a delay that doubles after every failed attempt. No delay is
//! taken after the final attempt.

use crate::platform::Delay;
use core::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_MAX_ATTEMPTS: u8 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub initial_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    pub attempts: u8,
    pub last_error: E,
}

impl RetryPolicy {
    pub fn new(max_attempts: u8, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay_ms: initial_delay.as_millis() as u64,
        }
    }

    /// Run `op` until it succeeds, the ceiling is reached, or `retryable`
    /// rejects the error. `op` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns the last error together with the attempt count when no attempt
    /// succeeded.
    pub fn run_while<T, E>(
        &self,
        delay: &mut dyn Delay,
        mut op: impl FnMut(u8) -> Result<T, E>,
        retryable: impl Fn(&E) -> bool,
    ) -> Result<T, RetryExhausted<E>> {
        let max_attempts = self.max_attempts.max(1);
        let mut backoff_ms = self.initial_delay_ms;
        let mut attempt = 1;

        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && retryable(&e) => {
                    debug!(attempt, backoff_ms, "attempt failed, backing off");
                    delay.delay_ms(backoff_ms);
                    backoff_ms = backoff_ms.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    })
                }
            }
        }
    }

    /// [`RetryPolicy::run_while`] treating every error as retryable.
    ///
    /// # Errors
    ///
    /// Returns the last error after `max_attempts` failures.
    pub fn run<T, E>(
        &self,
        delay: &mut dyn Delay,
        op: impl FnMut(u8) -> Result<T, E>,
    ) -> Result<T, RetryExhausted<E>> {
        self.run_while(delay, op, |_| true)
    }
}
