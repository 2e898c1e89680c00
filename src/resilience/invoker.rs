//! Resilient invoker: bulkhead → retry → circuit breaker → attempt.
//!
//! # Composition
//! ```text
//! Bulkhead admission (rejection never reaches the breaker)
//!     → Retry loop
//!         → Circuit breaker gate, re-checked on every attempt
//!             → transport attempt
//! ```
//!
//! An open breaker stops the retry loop on its first iteration because a
//! circuit-open rejection is not retryable.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::resilience::bulkhead::Bulkhead;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::error::{BulkheadError, CircuitBreakerError, DownstreamError, InvokeError};
use crate::resilience::retries::RetryExecutor;

/// Resilience stack for one downstream dependency.
#[derive(Debug)]
pub struct ResilientInvoker {
    name: String,
    bulkhead: Bulkhead,
    breaker: CircuitBreaker,
    retry: RetryExecutor,
}

impl ResilientInvoker {
    pub fn new(
        name: impl Into<String>,
        bulkhead: Bulkhead,
        breaker: CircuitBreaker,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            name: name.into(),
            bulkhead,
            breaker,
            retry,
        }
    }

    /// Build the stack for `name` from the shared resilience settings.
    pub fn from_config(name: &str, config: &GatewayConfig) -> Self {
        Self::new(
            name,
            Bulkhead::new(name, config.bulkhead.max_concurrent_calls),
            CircuitBreaker::new(name, &config.circuit_breaker),
            RetryExecutor::from_config(name, &config.retries),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    /// Invoke `attempt` under the full resilience stack.
    ///
    /// `attempt` is called once per try and must produce an independent future.
    pub async fn invoke<F, Fut, T>(&self, attempt: F) -> Result<T, InvokeError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, DownstreamError>>,
    {
        let breaker = &self.breaker;
        let retry = &self.retry;
        let attempt = &attempt;

        let result = self
            .bulkhead
            .execute(move || retry.execute(move || breaker.call(move || attempt())))
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(BulkheadError::Full {
                max_concurrent_calls,
            }) => Err(InvokeError::BulkheadFull {
                service: self.name.clone(),
                max_concurrent_calls,
            }),
            Err(BulkheadError::Inner(CircuitBreakerError::OpenCircuit { name })) => {
                Err(InvokeError::CircuitOpen { service: name })
            }
            Err(BulkheadError::Inner(CircuitBreakerError::Inner(source))) => {
                Err(InvokeError::Downstream {
                    service: self.name.clone(),
                    source,
                })
            }
        }
    }
}

/// One long-lived invoker per registered service.
#[derive(Debug, Default)]
pub struct InvokerRegistry {
    invokers: HashMap<String, Arc<ResilientInvoker>>,
}

impl InvokerRegistry {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let invokers = config
            .services
            .iter()
            .map(|service| {
                let key = service.key.to_lowercase();
                let invoker = Arc::new(ResilientInvoker::from_config(&key, config));
                (key, invoker)
            })
            .collect();
        Self { invokers }
    }

    pub fn get(&self, key: &str) -> Option<Arc<ResilientInvoker>> {
        self.invokers.get(&key.to_lowercase()).cloned()
    }

    /// Invokers sorted by service name.
    pub fn all(&self) -> Vec<Arc<ResilientInvoker>> {
        let mut all: Vec<_> = self.invokers.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    pub fn len(&self) -> usize {
        self.invokers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invokers.is_empty()
    }
}
