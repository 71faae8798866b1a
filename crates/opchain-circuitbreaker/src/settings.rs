use std::time::Duration;

/// Thresholds for one named circuit.
///
/// Settings belong to the circuit, not to a client: every breaker sharing a
/// circuit name reads the same values, and updating them through any
/// [`CircuitHandle`](crate::CircuitHandle) applies to all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CircuitBreakerSettings {
    /// Calls allowed in flight at once before new calls are rejected.
    pub max_concurrent_requests: usize,
    /// Calls the rolling window must hold before the circuit may trip.
    pub request_volume_threshold: usize,
    /// Time an open circuit waits before admitting a trial call.
    #[cfg_attr(feature = "serde", serde(rename = "sleep_window_ms", with = "millis"))]
    pub sleep_window: Duration,
    /// Error percentage (0..=100) at or above which the circuit trips.
    pub error_percent_threshold: u8,
    /// Length of the rolling statistics window.
    #[cfg_attr(feature = "serde", serde(rename = "rolling_window_ms", with = "millis"))]
    pub rolling_window: Duration,
}

impl CircuitBreakerSettings {
    /// Defaults: 100 concurrent requests, volume 20, 5s sleep window, 90%
    /// errors, 10s rolling window.
    pub const DEFAULT: Self = Self {
        max_concurrent_requests: 100,
        request_volume_threshold: 20,
        sleep_window: Duration::from_millis(5000),
        error_percent_threshold: 90,
        rolling_window: Duration::from_secs(10),
    };

    /// Sets the maximum number of calls in flight.
    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    /// Sets the minimum window volume before the circuit may trip.
    pub fn with_request_volume_threshold(mut self, threshold: usize) -> Self {
        self.request_volume_threshold = threshold;
        self
    }

    /// Sets how long an open circuit waits before a trial call.
    pub fn with_sleep_window(mut self, sleep_window: Duration) -> Self {
        self.sleep_window = sleep_window;
        self
    }

    /// Sets the tripping error percentage, clamped to 100.
    pub fn with_error_percent_threshold(mut self, percent: u8) -> Self {
        self.error_percent_threshold = percent.min(100);
        self
    }

    /// Sets the rolling window length.
    pub fn with_rolling_window(mut self, window: Duration) -> Self {
        self.rolling_window = window;
        self
    }
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Durations as whole milliseconds on the wire.
#[cfg(feature = "serde")]
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(crate) fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
