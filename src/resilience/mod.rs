//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a downstream service:
//!     → bulkhead.rs (admit or reject against the concurrency cap)
//!     → retries.rs (repeat retryable failures with jittered backoff)
//!     → circuit_breaker.rs (gate every attempt, track consecutive outcomes)
//!     → http/client.rs (the attempt itself, bounded by the endpoint timeout)
//! ```
//!
//! # Design Decisions
//! - One long-lived stack per downstream service, shared across requests
//! - Timeouts are non-negotiable; every downstream attempt has a deadline
//! - Protective rejections (open circuit, full bulkhead) are never retried

pub mod backoff;
pub mod bulkhead;
pub mod circuit_breaker;
pub mod error;
pub mod invoker;
pub mod retries;

pub use bulkhead::Bulkhead;
pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot, CircuitState};
pub use error::{BulkheadError, CircuitBreakerError, DownstreamError, InvokeError};
pub use invoker::{InvokerRegistry, ResilientInvoker};
pub use retries::{RetryExecutor, Retryable};
