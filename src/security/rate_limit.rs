//! Fixed-window rate limiting.
//!
//! # Design Decisions
//! - One window per admission key, created lazily and never evicted
//! - Capacity is restored in full at each window boundary, never partially
//! - Check-then-decrement runs under the key's shard lock (DashMap entry)

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

#[derive(Debug, Clone, Copy)]
struct Window {
    remaining: u32,
    started: Instant,
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Capacity left in the current window after this check.
    pub remaining: u32,
    /// Time until the current window resets.
    pub retry_after: Duration,
}

/// Per-key fixed-window counters.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one unit of `key`'s capacity if any is left.
    pub fn try_consume(&self, key: &str, capacity: u32, window: Duration) -> bool {
        self.check(key, capacity, window).allowed
    }

    /// Like [`try_consume`](Self::try_consume) but reports the window state.
    pub fn check(&self, key: &str, capacity: u32, window: Duration) -> RateLimitDecision {
        let now = Instant::now();
        let mut tracked = false;

        let decision = {
            let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| {
                tracked = true;
                Window {
                    remaining: capacity,
                    started: now,
                }
            });
            let current = entry.value_mut();

            if now.duration_since(current.started) >= window {
                current.remaining = capacity;
                current.started = now;
            }

            let allowed = current.remaining > 0;
            if allowed {
                current.remaining -= 1;
            }

            RateLimitDecision {
                allowed,
                remaining: current.remaining,
                retry_after: window.saturating_sub(now.duration_since(current.started)),
            }
        };

        if tracked {
            metrics::record_rate_limit_keys(self.windows.len());
        }
        decision
    }

    /// Number of admission keys currently tracked.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Rate limiter bound to the configured capacity and window.
#[derive(Debug)]
pub struct AdmissionControl {
    enabled: bool,
    capacity: u32,
    window: Duration,
    limiter: RateLimiter,
}

impl AdmissionControl {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            capacity: config.capacity,
            window: config.window(),
            limiter: RateLimiter::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Admit or reject one request for `key`. Returns the retry hint on rejection.
    pub fn admit(&self, key: &str) -> Result<(), Duration> {
        if !self.enabled {
            return Ok(());
        }

        let decision = self.limiter.check(key, self.capacity, self.window);
        if decision.allowed {
            Ok(())
        } else {
            tracing::warn!(client = %key, retry_after = ?decision.retry_after, "Rate limit exceeded");
            metrics::record_rate_limited();
            Err(decision.retry_after)
        }
    }
}
