//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: dependency assumed down, requests fail fast
//! - Half-Open: trial calls test whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: first call after cooldown has elapsed since the last failure
//! Half-Open → Closed: consecutive successes >= success_threshold
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - Per-dependency circuit breaker (not global)
//! - Fail fast in Open state without touching the dependency
//! - State lives behind a short synchronous lock, never held across an await

use serde::Serialize;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::resilience::error::CircuitBreakerError;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CircuitState {
    /// The circuit is closed and calls are allowed.
    Closed = 0,
    /// The circuit is open and calls are rejected.
    Open = 1,
    /// The circuit is half-open and trial calls are allowed.
    HalfOpen = 2,
}

/// Point-in-time view of a breaker, for the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    /// Milliseconds since the last recorded failure.
    pub last_failure_ms_ago: Option<u64>,
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure: Option<Instant>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_failure: None,
        }
    }
}

/// Failure isolation state machine for one protected dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    success_threshold: u32,
    cooldown: Duration,
    circuit: Mutex<Circuit>,
}

impl CircuitBreaker {
    /// Create a closed breaker protecting `name`.
    pub fn new(name: impl Into<String>, config: &CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            failure_threshold: config.failure_threshold.max(1),
            success_threshold: config.success_threshold.max(1),
            cooldown: config.cooldown(),
            circuit: Mutex::new(Circuit::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let circuit = self.lock();
        CircuitSnapshot {
            name: self.name.clone(),
            state: circuit.state,
            consecutive_failures: circuit.consecutive_failures,
            consecutive_successes: circuit.consecutive_successes,
            last_failure_ms_ago: circuit
                .last_failure
                .map(|at| at.elapsed().as_millis() as u64),
        }
    }

    /// Run `action` through the breaker.
    ///
    /// The action's error is returned after bookkeeping. In the Open state the
    /// action is not invoked and [`CircuitBreakerError::OpenCircuit`] is returned.
    pub async fn call<F, Fut, T, E>(&self, action: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.try_acquire() {
            metrics::record_circuit_rejection(&self.name);
            return Err(CircuitBreakerError::OpenCircuit {
                name: self.name.clone(),
            });
        }

        match action().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    /// Gate a call. Moves Open → Half-Open once the cooldown has elapsed.
    pub fn try_acquire(&self) -> bool {
        let mut circuit = self.lock();
        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = circuit
                    .last_failure
                    .map(|at| at.elapsed() >= self.cooldown)
                    .unwrap_or(true);
                if cooled_down {
                    circuit.consecutive_successes = 0;
                    self.transition(&mut circuit, CircuitState::HalfOpen);
                }
                cooled_down
            }
        }
    }

    pub fn record_success(&self) {
        let mut circuit = self.lock();
        match circuit.state {
            CircuitState::Closed => {
                circuit.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                circuit.consecutive_successes += 1;
                if circuit.consecutive_successes >= self.success_threshold {
                    circuit.consecutive_failures = 0;
                    circuit.consecutive_successes = 0;
                    self.transition(&mut circuit, CircuitState::Closed);
                }
            }
            // Late result of a call admitted before the circuit opened
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut circuit = self.lock();
        circuit.last_failure = Some(Instant::now());
        match circuit.state {
            CircuitState::Closed => {
                circuit.consecutive_failures += 1;
                if circuit.consecutive_failures >= self.failure_threshold {
                    tracing::warn!(
                        service = %self.name,
                        failures = circuit.consecutive_failures,
                        threshold = self.failure_threshold,
                        "Circuit breaker opened due to failures"
                    );
                    self.transition(&mut circuit, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                circuit.consecutive_failures += 1;
                circuit.consecutive_successes = 0;
                tracing::warn!(service = %self.name, "Circuit breaker reopened after half-open failure");
                self.transition(&mut circuit, CircuitState::Open);
            }
            CircuitState::Open => {
                circuit.consecutive_failures += 1;
            }
        }
    }

    /// Force the breaker closed with both counters zeroed.
    pub fn reset(&self) {
        let mut circuit = self.lock();
        circuit.consecutive_failures = 0;
        circuit.consecutive_successes = 0;
        self.transition(&mut circuit, CircuitState::Closed);
        tracing::info!(service = %self.name, "Circuit breaker reset");
    }

    fn transition(&self, circuit: &mut Circuit, to: CircuitState) {
        if circuit.state != to {
            tracing::info!(service = %self.name, from = ?circuit.state, to = ?to, "Circuit breaker state change");
        }
        circuit.state = to;
        metrics::record_circuit_state(&self.name, to);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Circuit> {
        self.circuit.lock().expect("circuit breaker mutex poisoned")
    }
}
