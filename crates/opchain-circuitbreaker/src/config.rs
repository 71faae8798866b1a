use crate::circuit::CircuitState;
use crate::classifier::{FnClassifier, ServerErrorClassifier};
use crate::events::{CircuitBreakerEvent, RejectReason};
use crate::registry::{circuit_name, CircuitRegistry};
use crate::settings::CircuitBreakerSettings;
use crate::telemetry::DEFAULT_TELEMETRY_INTERVAL;
use opchain_core::events::Listeners;
use std::sync::Arc;
use std::time::Duration;

/// Per-layer configuration of a circuit breaker.
///
/// Thresholds live on the named circuit (see [`CircuitBreakerSettings`]);
/// this holds what is private to one layer: its classifier and listeners.
pub struct CircuitBreakerConfig<C> {
    pub(crate) name: String,
    pub(crate) classifier: C,
    pub(crate) event_listeners: Listeners<CircuitBreakerEvent>,
}

/// Builder for [`CircuitBreakerLayer`](crate::CircuitBreakerLayer).
pub struct CircuitBreakerConfigBuilder<C = ServerErrorClassifier> {
    name: String,
    settings: CircuitBreakerSettings,
    debug: bool,
    classifier: C,
    registry: Option<Arc<CircuitRegistry>>,
    telemetry: Option<Duration>,
    event_listeners: Listeners<CircuitBreakerEvent>,
}

impl Default for CircuitBreakerConfigBuilder<ServerErrorClassifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerConfigBuilder<ServerErrorClassifier> {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - name: `"<unnamed>"`
    /// - settings: [`CircuitBreakerSettings::DEFAULT`]
    /// - debug mode: on (the breaker counts but never blocks)
    /// - classifier: [`ServerErrorClassifier`]
    /// - registry: [`CircuitRegistry::global`]
    /// - telemetry: every 10s
    pub fn new() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            settings: CircuitBreakerSettings::DEFAULT,
            debug: true,
            classifier: ServerErrorClassifier,
            registry: None,
            telemetry: Some(DEFAULT_TELEMETRY_INTERVAL),
            event_listeners: Listeners::new(),
        }
    }
}

impl<C> CircuitBreakerConfigBuilder<C> {
    /// Sets the circuit name directly.
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Names the circuit after a service and its base address.
    ///
    /// See [`circuit_name`].
    pub fn for_backend(mut self, service: &str, base_url: &str) -> Self {
        self.name = circuit_name(service, base_url);
        self
    }

    /// Sets the settings used if this layer creates the circuit.
    ///
    /// An already registered circuit keeps its current settings; use
    /// [`CircuitHandle::set_settings`](crate::CircuitHandle::set_settings)
    /// to change them.
    pub fn settings(mut self, settings: CircuitBreakerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Turns debug mode on or off.
    ///
    /// In debug mode every call runs; the circuit still counts outcomes and
    /// changes state, but never rejects.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Uses `registry` instead of the global registry.
    pub fn registry(mut self, registry: Arc<CircuitRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the cadence of periodic telemetry snapshots.
    pub fn telemetry_interval(mut self, interval: Duration) -> Self {
        self.telemetry = Some(interval);
        self
    }

    /// Disables the background telemetry task.
    pub fn without_telemetry(mut self) -> Self {
        self.telemetry = None;
        self
    }

    /// Sets a custom failure classifier.
    pub fn failure_classifier<F, Res, Err>(self, f: F) -> CircuitBreakerConfigBuilder<FnClassifier<F>>
    where
        F: Fn(&Result<Res, Err>) -> bool + Send + Sync + 'static,
    {
        CircuitBreakerConfigBuilder {
            name: self.name,
            settings: self.settings,
            debug: self.debug,
            classifier: FnClassifier::new(f),
            registry: self.registry,
            telemetry: self.telemetry,
            event_listeners: self.event_listeners,
        }
    }

    /// Registers a callback for state transitions.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let CircuitBreakerEvent::StateTransition {
                from_state,
                to_state,
                ..
            } = event
            {
                f(*from_state, *to_state);
            }
        });
        self
    }

    /// Registers a callback for admitted calls.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                f(*state);
            }
        });
        self
    }

    /// Registers a callback for rejected calls.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(RejectReason) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let CircuitBreakerEvent::CallRejected { reason, .. } = event {
                f(*reason);
            }
        });
        self
    }

    /// Registers a callback for calls debug mode let through.
    pub fn on_rejection_bypassed<F>(mut self, f: F) -> Self
    where
        F: Fn(RejectReason) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let CircuitBreakerEvent::RejectionBypassed { reason, .. } = event {
                f(*reason);
            }
        });
        self
    }

    /// Registers a callback for calls counted as successes.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                f(*state);
            }
        });
        self
    }

    /// Registers a callback for calls counted as failures.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let CircuitBreakerEvent::FailureRecorded { state, .. } = event {
                f(*state);
            }
        });
        self
    }

    /// Builds the layer, registering the circuit if needed and starting its
    /// telemetry task.
    pub fn build(self) -> crate::CircuitBreakerLayer<C> {
        let registry = self.registry.unwrap_or_else(CircuitRegistry::global);
        let circuit = registry.get_or_create(&self.name, &self.settings);
        if let Some(interval) = self.telemetry {
            registry.start_telemetry(&circuit, interval);
        }

        crate::CircuitBreakerLayer::new(
            CircuitBreakerConfig {
                name: self.name,
                classifier: self.classifier,
                event_listeners: self.event_listeners,
            },
            circuit,
            self.debug,
        )
    }
}
