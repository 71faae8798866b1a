use crate::circuit::{CircuitMetrics, CircuitState};
use crate::events::CircuitBreakerEvent;
use crate::settings::CircuitBreakerSettings;
use crate::shared::SharedCircuit;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Inspection and control of one named circuit.
///
/// Handles are cheap to clone and refer to the circuit itself, so every
/// breaker and client sharing the name observes the same state.
#[derive(Clone)]
pub struct CircuitHandle {
    circuit: Arc<SharedCircuit>,
}

impl CircuitHandle {
    pub(crate) fn new(circuit: Arc<SharedCircuit>) -> Self {
        Self { circuit }
    }

    /// Returns the circuit's name.
    pub fn name(&self) -> &str {
        &self.circuit.name
    }

    /// Returns the current state without locking.
    pub fn state(&self) -> CircuitState {
        self.circuit.state()
    }

    /// Returns true if the circuit is open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Returns a snapshot of the rolling statistics.
    pub async fn metrics(&self) -> CircuitMetrics {
        self.circuit.metrics().await
    }

    /// Returns the circuit's current settings.
    pub fn settings(&self) -> CircuitBreakerSettings {
        (*self.circuit.settings()).clone()
    }

    /// Replaces the circuit's settings for every breaker using it.
    pub fn set_settings(&self, settings: CircuitBreakerSettings) {
        tracing::info!(circuit = %self.circuit.name, ?settings, "circuit settings updated");
        self.circuit.set_settings(settings);
    }

    /// Forces the circuit open.
    pub async fn force_open(&self) {
        self.circuit.force_open().await;
    }

    /// Forces the circuit closed.
    pub async fn force_closed(&self) {
        self.circuit.force_closed().await;
    }

    /// Closes the circuit and clears its statistics.
    pub async fn reset(&self) {
        self.circuit.reset().await;
    }

    /// Subscribes to the circuit's state transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<CircuitBreakerEvent> {
        self.circuit.subscribe()
    }
}

impl fmt::Debug for CircuitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitHandle")
            .field("name", &self.circuit.name)
            .field("state", &self.state())
            .finish()
    }
}
