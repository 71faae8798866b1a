use rand::Rng;
use std::fmt;
use std::time::Duration;

/// Produces the delays a retry policy waits between attempts.
///
/// The schedule's length is the maximum number of retries.
pub trait Backoff: Send + Sync + fmt::Debug {
    /// Returns the delay before each retry, in order.
    fn schedule(&self) -> Vec<Duration>;
}

/// The same delay before every retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    delay: Duration,
    retries: usize,
}

impl FixedBackoff {
    /// Creates a schedule of `retries` identical delays.
    pub fn new(delay: Duration, retries: usize) -> Self {
        Self { delay, retries }
    }
}

impl Backoff for FixedBackoff {
    fn schedule(&self) -> Vec<Duration> {
        vec![self.delay; self.retries]
    }
}

/// Delays that grow geometrically, optionally jittered and capped.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    retries: usize,
    jitter: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Creates a doubling schedule of `retries` delays starting at `initial_interval`.
    pub fn new(initial_interval: Duration, retries: usize) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            retries,
            jitter: 0.0,
            max_interval: None,
        }
    }

    /// Sets the growth factor between consecutive delays.
    ///
    /// Negative, NaN and infinite factors are ignored.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        if multiplier.is_finite() && multiplier >= 0.0 {
            self.multiplier = multiplier;
        }
        self
    }

    /// Randomizes each delay within `±factor` of its nominal value.
    ///
    /// A factor of 0.05 spreads a 100ms delay over 95ms..=105ms.
    pub fn jitter(mut self, factor: f64) -> Self {
        self.jitter = factor.clamp(0.0, 1.0);
        self
    }

    /// Caps every nominal delay before jitter is applied.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }

    /// Saturates at the cap, or at `Duration::MAX` when uncapped.
    fn nominal(&self, retry: usize) -> Duration {
        if self.initial_interval.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let mut secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        if let Some(max) = self.max_interval {
            secs = secs.min(max.as_secs_f64());
        }
        Duration::try_from_secs_f64(secs).unwrap_or(self.max_interval.unwrap_or(Duration::MAX))
    }

    fn randomize(&self, duration: Duration) -> Duration {
        if self.jitter == 0.0 {
            return duration;
        }
        let secs = duration.as_secs_f64();
        let delta = secs * self.jitter;
        let randomized = rand::rng().random_range((secs - delta)..=(secs + delta));
        Duration::try_from_secs_f64(randomized.max(0.0)).unwrap_or(duration)
    }
}

impl Backoff for ExponentialBackoff {
    fn schedule(&self) -> Vec<Duration> {
        (0..self.retries)
            .map(|retry| self.randomize(self.nominal(retry)))
            .collect()
    }
}
