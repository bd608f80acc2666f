//! Bounded retry of a fallible operation.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::BackendError;

/// Decides whether a failed attempt is retried, and waits before it is.
pub trait RetryStrategy<E> {
    /// Called after attempt number `attempt` (1-based) failed with `error`.
    /// Returning true schedules another attempt; any waiting happens here.
    fn should_retry(&self, error: &E, attempt: usize) -> bool;
}

impl<E, F> RetryStrategy<E> for F
where
    F: Fn(&E, usize) -> bool,
{
    fn should_retry(&self, error: &E, attempt: usize) -> bool {
        self(error, attempt)
    }
}

/// Runs an operation until it succeeds, the strategy gives up, or
/// `max_attempts` attempts have been made.
#[derive(Debug)]
pub struct CommandRetry<S> {
    strategy: S,
    max_attempts: usize,
    attempts: usize,
}

impl<S> CommandRetry<S> {
    pub fn new(strategy: S, max_attempts: usize) -> Self {
        Self {
            strategy,
            max_attempts: max_attempts.max(1),
            attempts: 0,
        }
    }

    /// Invokes `action` until it returns `Ok`, or returns the last error.
    pub fn run<T, E, F>(&mut self, mut action: F) -> Result<T, E>
    where
        S: RetryStrategy<E>,
        F: FnMut() -> Result<T, E>,
    {
        self.attempts = 0;
        loop {
            self.attempts += 1;
            match action() {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if self.attempts >= self.max_attempts
                        || !self.strategy.should_retry(&error, self.attempts)
                    {
                        return Err(error);
                    }
                    warn!(
                        attempt = self.attempts,
                        max_attempts = self.max_attempts,
                        "retrying failed command"
                    );
                }
            }
        }
    }

    /// Attempts consumed by the last `run`, including the final one.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

/// Retries backend errors whose code is in a fixed set, sleeping a linearly
/// growing delay capped at `max_delay` between attempts.
#[derive(Debug, Clone)]
pub struct ErrorCodeWaitStrategy {
    codes: Vec<String>,
    delay: Duration,
    max_delay: Duration,
}

impl ErrorCodeWaitStrategy {
    pub fn new(codes: Vec<String>, delay: Duration) -> Self {
        Self {
            codes,
            delay,
            max_delay: Duration::from_secs(5),
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn is_retryable(&self, error: &BackendError) -> bool {
        match &error.code {
            Some(code) => self.codes.iter().any(|c| c == code),
            None => false,
        }
    }

    /// Wait before the attempt following attempt number `attempt`.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = u32::try_from(attempt).unwrap_or(u32::MAX);
        self.delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl RetryStrategy<BackendError> for ErrorCodeWaitStrategy {
    fn should_retry(&self, error: &BackendError, attempt: usize) -> bool {
        if !self.is_retryable(error) {
            return false;
        }
        let wait = self.delay_for(attempt);
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        true
    }
}
