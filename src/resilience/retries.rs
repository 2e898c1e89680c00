//! Retry logic.
//!
//! # Responsibilities
//! - Classify failures as retryable or not
//! - Execute retries with exponential backoff + jitter
//!
//! # Design Decisions
//! - Timeouts, connection errors and transient statuses are retryable
//! - Everything else propagates on first occurrence
//! - Jittered backoff prevents thundering herd
//! - Exhaustion returns the last observed failure

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::ExponentialBackoff;
use crate::resilience::error::{CircuitBreakerError, DownstreamError};

/// Failure classification consulted by the retry loop.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for DownstreamError {
    fn is_retryable(&self) -> bool {
        DownstreamError::is_retryable(self)
    }
}

/// A circuit-open rejection is never retried.
impl<E: Retryable> Retryable for CircuitBreakerError<E> {
    fn is_retryable(&self) -> bool {
        match self {
            CircuitBreakerError::OpenCircuit { .. } => false,
            CircuitBreakerError::Inner(e) => e.is_retryable(),
        }
    }
}

/// Bounded retry with geometric backoff.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    name: String,
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
}

impl RetryExecutor {
    pub fn new(
        name: impl Into<String>,
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            name: name.into(),
            max_retries,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    pub fn from_config(name: impl Into<String>, config: &RetryConfig) -> Self {
        Self::new(
            name,
            config.max_retries,
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.backoff_multiplier,
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `action`, retrying retryable failures up to `max_retries` extra times.
    pub async fn execute<F, Fut, T, E>(&self, mut action: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let mut backoff =
            ExponentialBackoff::new(self.initial_delay, self.max_delay, self.backoff_multiplier);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let error = match action().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_retryable() {
                tracing::debug!(service = %self.name, attempt, error = %error, "Non-retryable failure");
                return Err(error);
            }
            if attempt > self.max_retries {
                tracing::warn!(service = %self.name, attempts = attempt, error = %error, "Retries exhausted");
                return Err(error);
            }

            let delay = backoff.next_delay();
            tracing::info!(service = %self.name, attempt, delay = ?delay, error = %error, "Retrying request");
            metrics::record_retry(&self.name);
            tokio::time::sleep(delay).await;
        }
    }
}
