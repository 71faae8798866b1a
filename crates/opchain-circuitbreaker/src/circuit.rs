use crate::events::{CircuitBreakerEvent, RejectReason};
use crate::settings::CircuitBreakerSettings;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge, histogram};
use opchain_core::events::Listeners;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls are admitted and counted.
    Closed = 0,
    /// Calls are rejected until the sleep window elapses.
    Open = 1,
    /// A single trial call decides between closing and re-opening.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Lower-case name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Point-in-time view of a circuit's rolling statistics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircuitMetrics {
    /// Current state.
    pub state: CircuitState,
    /// Calls recorded in the rolling window.
    pub total_calls: usize,
    /// Failed calls in the rolling window.
    pub error_count: usize,
    /// `error_count` as a percentage of `total_calls` (0.0 to 100.0).
    pub error_percentage: f64,
    /// Calls currently in flight.
    pub in_flight: usize,
    /// Time since the last state transition.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "ms_since_state_change", serialize_with = "crate::settings::millis::serialize")
    )]
    pub time_since_state_change: Duration,
}

#[derive(Debug, Clone, Copy)]
struct CallRecord {
    timestamp: Instant,
    is_failure: bool,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Permitted,
    Trial,
    Rejected(RejectReason),
}

/// Sends events to the layer's listeners and state transitions to the
/// circuit's telemetry stream.
pub(crate) struct Emitter<'a> {
    pub(crate) name: &'a str,
    pub(crate) listeners: &'a Listeners<CircuitBreakerEvent>,
    pub(crate) telemetry: &'a broadcast::Sender<CircuitBreakerEvent>,
}

impl Emitter<'_> {
    pub(crate) fn emit(&self, event: CircuitBreakerEvent) {
        self.listeners.emit(&event);
        if matches!(event, CircuitBreakerEvent::StateTransition { .. }) {
            // No receiver means no telemetry task; nothing to do.
            let _ = self.telemetry.send(event);
        }
    }
}

/// Rolling-window state machine of one named circuit.
pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    last_state_change: Instant,
    call_records: VecDeque<CallRecord>,
}

impl Circuit {
    pub(crate) fn new(state_atomic: Arc<AtomicU8>) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            last_state_change: Instant::now(),
            call_records: VecDeque::new(),
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn metrics(
        &mut self,
        settings: &CircuitBreakerSettings,
        in_flight: usize,
    ) -> CircuitMetrics {
        self.cleanup_old_records(settings.rolling_window);
        let (total_calls, error_count) = self.window_stats();
        CircuitMetrics {
            state: self.state,
            total_calls,
            error_count,
            error_percentage: error_percentage(total_calls, error_count),
            in_flight,
            time_since_state_change: self.last_state_change.elapsed(),
        }
    }

    /// Decides whether a call may run.
    ///
    /// `trial` is the circuit's trial-in-flight flag; a `Trial` admission
    /// sets it and the caller clears it when the trial finishes.
    pub(crate) fn admit(
        &mut self,
        settings: &CircuitBreakerSettings,
        in_flight: usize,
        trial: &AtomicBool,
        emitter: &Emitter<'_>,
    ) -> Admission {
        if self.state == CircuitState::Open {
            if self.last_state_change.elapsed() < settings.sleep_window {
                return Admission::Rejected(RejectReason::Open);
            }
            self.transition_to(CircuitState::HalfOpen, emitter);
        }

        if in_flight >= settings.max_concurrent_requests {
            return Admission::Rejected(RejectReason::MaxConcurrency(
                settings.max_concurrent_requests,
            ));
        }

        match self.state {
            CircuitState::Closed => Admission::Permitted,
            CircuitState::HalfOpen | CircuitState::Open => {
                if trial.swap(true, Ordering::AcqRel) {
                    Admission::Rejected(RejectReason::Open)
                } else {
                    Admission::Trial
                }
            }
        }
    }

    /// Records a finished call.
    ///
    /// A trial call decides the half-open circuit: success closes it, failure
    /// re-opens it. Other calls only update the window, which may trip a
    /// closed circuit.
    pub(crate) fn record(
        &mut self,
        settings: &CircuitBreakerSettings,
        is_failure: bool,
        trial: bool,
        duration: Duration,
        emitter: &Emitter<'_>,
    ) {
        self.cleanup_old_records(settings.rolling_window);
        self.call_records.push_back(CallRecord {
            timestamp: Instant::now(),
            is_failure,
        });

        let timestamp = std::time::Instant::now();
        let source = emitter.name.to_string();
        emitter.emit(if is_failure {
            CircuitBreakerEvent::FailureRecorded {
                source,
                timestamp,
                state: self.state,
                duration,
            }
        } else {
            CircuitBreakerEvent::SuccessRecorded {
                source,
                timestamp,
                state: self.state,
                duration,
            }
        });

        #[cfg(feature = "metrics")]
        {
            let outcome = if is_failure { "failure" } else { "success" };
            counter!("circuitbreaker_calls_total", "circuitbreaker" => emitter.name.to_string(), "outcome" => outcome).increment(1);
            histogram!("circuitbreaker_call_duration_seconds", "circuitbreaker" => emitter.name.to_string())
                .record(duration.as_secs_f64());
        }

        if trial {
            let next = if is_failure {
                CircuitState::Open
            } else {
                CircuitState::Closed
            };
            self.transition_to(next, emitter);
        } else if self.state == CircuitState::Closed {
            self.evaluate_window(settings, emitter);
        }
    }

    pub(crate) fn force_open(&mut self, emitter: &Emitter<'_>) {
        self.transition_to(CircuitState::Open, emitter);
    }

    pub(crate) fn force_closed(&mut self, emitter: &Emitter<'_>) {
        self.transition_to(CircuitState::Closed, emitter);
    }

    pub(crate) fn reset(&mut self, emitter: &Emitter<'_>) {
        self.transition_to(CircuitState::Closed, emitter);
        self.call_records.clear();
        self.last_state_change = Instant::now();
    }

    fn cleanup_old_records(&mut self, window: Duration) {
        let now = Instant::now();
        while let Some(record) = self.call_records.front() {
            if now.duration_since(record.timestamp) > window {
                self.call_records.pop_front();
            } else {
                break;
            }
        }
    }

    fn window_stats(&self) -> (usize, usize) {
        let failures = self.call_records.iter().filter(|r| r.is_failure).count();
        (self.call_records.len(), failures)
    }

    fn evaluate_window(&mut self, settings: &CircuitBreakerSettings, emitter: &Emitter<'_>) {
        let (total, failures) = self.window_stats();
        if total == 0 || total < settings.request_volume_threshold {
            return;
        }
        if error_percentage(total, failures) >= f64::from(settings.error_percent_threshold) {
            self.transition_to(CircuitState::Open, emitter);
        }
    }

    fn transition_to(&mut self, state: CircuitState, emitter: &Emitter<'_>) {
        if self.state == state {
            return;
        }
        let from_state = self.state;

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_state_change = Instant::now();
        self.call_records.clear();

        match state {
            CircuitState::Open => {
                tracing::warn!(circuit = emitter.name, from = from_state.as_str(), "circuit opened")
            }
            _ => tracing::info!(
                circuit = emitter.name,
                from = from_state.as_str(),
                to = state.as_str(),
                "circuit state transition"
            ),
        }

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => emitter.name.to_string(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);
            gauge!("circuitbreaker_state", "circuitbreaker" => emitter.name.to_string())
                .set(f64::from(state as u8));
        }

        emitter.emit(CircuitBreakerEvent::StateTransition {
            source: emitter.name.to_string(),
            timestamp: std::time::Instant::now(),
            from_state,
            to_state: state,
        });
    }
}

fn error_percentage(total: usize, failures: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        failures as f64 * 100.0 / total as f64
    }
}
