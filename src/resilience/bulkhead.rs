//! Bulkhead: hard concurrency cap per downstream dependency.
//!
//! # Design Decisions
//! - No queueing: a call over the cap is rejected immediately
//! - Admission is a single compare-and-swap on the in-flight counter
//! - The slot is released by a guard, however the call terminates

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::observability::metrics;
use crate::resilience::error::BulkheadError;

/// Concurrency limiter for one protected dependency.
#[derive(Debug)]
pub struct Bulkhead {
    name: String,
    max_concurrent_calls: usize,
    in_flight: AtomicUsize,
}

impl Bulkhead {
    pub fn new(name: impl Into<String>, max_concurrent_calls: usize) -> Self {
        Self {
            name: name.into(),
            max_concurrent_calls,
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_concurrent_calls(&self) -> usize {
        self.max_concurrent_calls
    }

    /// Number of calls currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Try to take a slot. Returns a guard that releases it on drop.
    pub fn try_acquire(&self) -> Option<BulkheadPermit<'_>> {
        let mut prev = self.in_flight.load(Ordering::Acquire);
        loop {
            if prev >= self.max_concurrent_calls {
                return None;
            }
            match self.in_flight.compare_exchange_weak(
                prev,
                prev + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(x) => prev = x,
            }
        }
        metrics::record_bulkhead_in_flight(&self.name, prev + 1);
        Some(BulkheadPermit { bulkhead: self })
    }

    /// Run `action` if a slot is free, otherwise reject without running it.
    pub async fn execute<F, Fut, T, E>(&self, action: F) -> Result<T, BulkheadError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(_permit) = self.try_acquire() else {
            tracing::warn!(
                service = %self.name,
                max_concurrent_calls = self.max_concurrent_calls,
                "Bulkhead limit reached"
            );
            metrics::record_bulkhead_rejection(&self.name);
            return Err(BulkheadError::Full {
                max_concurrent_calls: self.max_concurrent_calls,
            });
        };

        action().await.map_err(BulkheadError::Inner)
    }
}

/// A RAII guard holding one bulkhead slot.
#[derive(Debug)]
pub struct BulkheadPermit<'a> {
    bulkhead: &'a Bulkhead,
}

impl Drop for BulkheadPermit<'_> {
    fn drop(&mut self) {
        let remaining = self.bulkhead.in_flight.fetch_sub(1, Ordering::AcqRel) - 1;
        metrics::record_bulkhead_in_flight(&self.bulkhead.name, remaining);
    }
}
