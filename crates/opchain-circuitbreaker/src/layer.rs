use crate::classifier::ServerErrorClassifier;
use crate::config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
use crate::handle::CircuitHandle;
use crate::shared::SharedCircuit;
use crate::CircuitBreaker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::Layer;

/// A Tower Layer that guards a doer with a named circuit.
///
/// ```rust
/// use opchain_circuitbreaker::{CircuitBreakerLayer, CircuitBreakerSettings};
/// use std::time::Duration;
///
/// let layer = CircuitBreakerLayer::builder()
///     .for_backend("library", "http://library.internal:8080")
///     .settings(
///         CircuitBreakerSettings::default()
///             .with_request_volume_threshold(10)
///             .with_sleep_window(Duration::from_secs(2)),
///     )
///     .debug(false)
///     .without_telemetry()
///     .build();
///
/// assert!(!layer.is_debug());
/// ```
///
/// Every service produced by one layer shares its debug flag, so
/// [`set_debug`](Self::set_debug) switches all of them at once.
pub struct CircuitBreakerLayer<C = ServerErrorClassifier> {
    config: Arc<CircuitBreakerConfig<C>>,
    circuit: Arc<SharedCircuit>,
    debug: Arc<AtomicBool>,
}

impl CircuitBreakerLayer<ServerErrorClassifier> {
    /// Creates a new builder.
    pub fn builder() -> CircuitBreakerConfigBuilder<ServerErrorClassifier> {
        CircuitBreakerConfigBuilder::new()
    }
}

impl<C> CircuitBreakerLayer<C> {
    pub(crate) fn new(config: CircuitBreakerConfig<C>, circuit: Arc<SharedCircuit>, debug: bool) -> Self {
        Self {
            config: Arc::new(config),
            circuit,
            debug: Arc::new(AtomicBool::new(debug)),
        }
    }

    /// Returns a handle to the layer's circuit.
    pub fn handle(&self) -> CircuitHandle {
        CircuitHandle::new(Arc::clone(&self.circuit))
    }

    /// Returns true if debug mode is on.
    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Acquire)
    }

    /// Turns debug mode on or off for every service built by this layer.
    pub fn set_debug(&self, debug: bool) {
        let enabled = debug;
        tracing::info!(circuit = %self.config.name, debug = enabled, "circuit breaker debug mode changed");
        self.debug.store(debug, Ordering::Release);
    }

    /// Returns the shared debug flag.
    pub fn debug_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.debug)
    }
}

impl<C> Clone for CircuitBreakerLayer<C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            circuit: Arc::clone(&self.circuit),
            debug: Arc::clone(&self.debug),
        }
    }
}

impl<S, C> Layer<S> for CircuitBreakerLayer<C> {
    type Service = CircuitBreaker<S, C>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(
            service,
            Arc::clone(&self.config),
            Arc::clone(&self.circuit),
            Arc::clone(&self.debug),
        )
    }
}
