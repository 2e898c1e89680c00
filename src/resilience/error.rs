//! Error types shared by the resilience primitives.

use axum::http::StatusCode;
use std::time::Duration;

/// Failure of a single downstream attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownstreamError {
    /// The attempt exceeded its per-call deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Transport-level failure (connect refused, reset, DNS).
    #[error("connection failed: {0}")]
    Connect(String),
    /// Downstream answered with a transient status (5xx, 408, 429).
    #[error("upstream responded with {0}")]
    Status(StatusCode),
    /// Anything else; never retried.
    #[error("request failed: {0}")]
    Other(String),
}

impl DownstreamError {
    /// Timeouts, transport failures and transient statuses are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            DownstreamError::Timeout(_) | DownstreamError::Connect(_) => true,
            DownstreamError::Status(status) => is_retryable_status(*status),
            DownstreamError::Other(_) => false,
        }
    }
}

/// Server-side statuses treated as transient.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

/// Error produced by [`CircuitBreaker::call`](super::circuit_breaker::CircuitBreaker::call).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the action was not attempted.
    #[error("circuit breaker is open for {name}, service temporarily unavailable")]
    OpenCircuit { name: String },
    /// The action ran and failed.
    #[error(transparent)]
    Inner(E),
}

/// Error produced by [`Bulkhead::execute`](super::bulkhead::Bulkhead::execute).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkheadError<E> {
    /// The bulkhead rejected the call because it's at capacity.
    #[error("bulkhead is full: max concurrent calls ({max_concurrent_calls}) reached")]
    Full { max_concurrent_calls: usize },
    #[error(transparent)]
    Inner(E),
}

/// Flattened outcome of a [`ResilientInvoker`](super::invoker::ResilientInvoker) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    #[error("circuit breaker is open for {service}, service temporarily unavailable")]
    CircuitOpen { service: String },
    #[error("bulkhead limit reached for {service}: max concurrent calls ({max_concurrent_calls})")]
    BulkheadFull {
        service: String,
        max_concurrent_calls: usize,
    },
    #[error("{service} call failed: {source}")]
    Downstream {
        service: String,
        #[source]
        source: DownstreamError,
    },
}

impl InvokeError {
    /// Protective rejections never reached the downstream service.
    pub fn is_protective(&self) -> bool {
        matches!(
            self,
            InvokeError::CircuitOpen { .. } | InvokeError::BulkheadFull { .. }
        )
    }
}
