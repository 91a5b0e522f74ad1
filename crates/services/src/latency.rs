//! Simulated network latency for step loading.

use std::fmt;
use std::time::Duration;

use rand::Rng;

/// Delay policy applied by `CourseService` before returning a step.
pub trait Latency: Send + Sync + fmt::Debug {
    /// Delay for a step already in the cache.
    fn cached(&self) -> Duration;

    /// Delay for a step fetched from the source.
    fn fresh(&self) -> Duration;
}

/// Short fixed delay on cache hits, uniformly random delay otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedLatency {
    cached: Duration,
    min: Duration,
    max: Duration,
}

impl SimulatedLatency {
    /// Bounds are reordered if `min > max`.
    #[must_use]
    pub fn new(cached: Duration, min: Duration, max: Duration) -> Self {
        Self {
            cached,
            min: min.min(max),
            max: max.max(min),
        }
    }

    #[must_use]
    pub fn bounds(&self) -> (Duration, Duration) {
        (self.min, self.max)
    }
}

impl Default for SimulatedLatency {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(300),
            Duration::from_millis(800),
            Duration::from_millis(2000),
        )
    }
}

impl Latency for SimulatedLatency {
    fn cached(&self) -> Duration {
        self.cached
    }

    fn fresh(&self) -> Duration {
        let min = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

/// Constant delays; `FixedLatency::instant()` disables waiting entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLatency {
    pub cached: Duration,
    pub fresh: Duration,
}

impl FixedLatency {
    #[must_use]
    pub fn instant() -> Self {
        Self {
            cached: Duration::ZERO,
            fresh: Duration::ZERO,
        }
    }
}

impl Latency for FixedLatency {
    fn cached(&self) -> Duration {
        self.cached
    }

    fn fresh(&self) -> Duration {
        self.fresh
    }
}
