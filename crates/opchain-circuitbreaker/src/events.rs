use crate::circuit::CircuitState;
use opchain_core::events::PipelineEvent;
use std::time::{Duration, Instant};

/// Why the breaker turned a call away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The circuit is open, or half-open with its trial call in flight.
    Open,
    /// The circuit already has this many calls in flight.
    MaxConcurrency(usize),
}

/// Events emitted by the circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The circuit changed state.
    StateTransition {
        source: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// A call was admitted.
    CallPermitted {
        source: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call was rejected without being attempted.
    CallRejected {
        source: String,
        timestamp: Instant,
        reason: RejectReason,
    },
    /// Debug mode let through a call the breaker would have rejected.
    RejectionBypassed {
        source: String,
        timestamp: Instant,
        reason: RejectReason,
    },
    /// A call finished and counted as a success.
    SuccessRecorded {
        source: String,
        timestamp: Instant,
        state: CircuitState,
        duration: Duration,
    },
    /// A call finished and counted as a failure.
    FailureRecorded {
        source: String,
        timestamp: Instant,
        state: CircuitState,
        duration: Duration,
    },
}

impl PipelineEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::RejectionBypassed { .. } => "rejection_bypassed",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::RejectionBypassed { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { source, .. }
            | CircuitBreakerEvent::CallPermitted { source, .. }
            | CircuitBreakerEvent::CallRejected { source, .. }
            | CircuitBreakerEvent::RejectionBypassed { source, .. }
            | CircuitBreakerEvent::SuccessRecorded { source, .. }
            | CircuitBreakerEvent::FailureRecorded { source, .. } => source,
        }
    }
}
