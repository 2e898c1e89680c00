//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Fraction of the computed delay used as symmetric jitter.
const JITTER_FACTOR: f64 = 0.1;

/// Geometric backoff schedule.
///
/// Each call to [`next_delay`](Self::next_delay) yields `min(max, current)`
/// perturbed by ±10%, then multiplies `current` by the multiplier.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current: Duration,
    max: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            current: initial,
            max,
            multiplier,
        }
    }

    /// Next delay before jitter; advances the schedule.
    pub fn next_base(&mut self) -> Duration {
        let delay = self.current.min(self.max);
        self.current = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.multiplier)
            .map_or(self.max, |next| next.min(self.max));
        delay
    }

    /// Next jittered delay; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        apply_jitter(self.next_base())
    }
}

/// Perturb a delay by a uniformly random offset within ±10% of it.
pub fn apply_jitter(delay: Duration) -> Duration {
    let range = delay.as_secs_f64() * JITTER_FACTOR;
    if range <= 0.0 {
        return delay;
    }
    let offset = rand::thread_rng().gen_range(-range..=range);
    Duration::from_secs_f64((delay.as_secs_f64() + offset).max(0.0))
}
