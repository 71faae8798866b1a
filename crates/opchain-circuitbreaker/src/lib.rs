//! Circuit breaker decorator for the opchain request pipeline.
//!
//! A [`CircuitBreaker`] guards a doer with a *named circuit*: rolling
//! statistics and thresholds shared by every breaker that uses the name. A
//! client names its circuit after its service and a hash of its base address
//! ([`circuit_name`]), so constructing many clients against one backend
//! reuses one circuit and its configuration.
//!
//! The breaker's verdict is separate from the call's result. A
//! [`FailureClassifier`](classifier::FailureClassifier) decides what counts as
//! a failure; by default transport errors and 5xx responses do. The call's
//! own response or error is passed through unchanged.
//!
//! # Modes
//!
//! - **Debug** (default): every call runs. Outcomes are counted and the
//!   circuit changes state, but it never blocks. Useful for watching a new
//!   backend's error rate before enforcing.
//! - **Enforcing**: an open circuit rejects calls with
//!   [`CircuitBreakerError::OpenCircuit`] without any I/O until the sleep
//!   window elapses. It then admits a single trial call: success closes the
//!   circuit, failure re-opens it. Calls beyond the concurrency limit are
//!   rejected with [`CircuitBreakerError::MaxConcurrency`].
//!
//! # Thresholds
//!
//! | Setting | Default |
//! |---|---|
//! | `max_concurrent_requests` | 100 |
//! | `request_volume_threshold` | 20 calls in the rolling window |
//! | `sleep_window` | 5000ms |
//! | `error_percent_threshold` | 90% |
//! | `rolling_window` | 10s |
//!
//! # Telemetry
//!
//! Building a layer starts one background task per circuit name that logs a
//! snapshot on every state change and periodically. Without a tokio runtime
//! the task is skipped with a warning.
//!
//! # Example
//!
//! ```rust
//! use opchain_circuitbreaker::{CircuitBreakerLayer, CircuitState};
//! use opchain_core::{Call, CallContext, HttpResponse, TransportError};
//! use tower::{Layer, ServiceExt};
//!
//! # async fn example() {
//! let layer = CircuitBreakerLayer::builder()
//!     .for_backend("library", "http://library.internal")
//!     .debug(false)
//!     .build();
//! let handle = layer.handle();
//!
//! let service = layer.layer(tower::service_fn(|_call: Call| async {
//!     Ok::<_, TransportError>(HttpResponse::new(bytes::Bytes::new()))
//! }));
//!
//! let request = http::Request::get("http://library.internal/v1/books")
//!     .body(bytes::Bytes::new())
//!     .unwrap();
//! let _ = service.oneshot(Call::new(CallContext::new(), request)).await;
//! assert_eq!(handle.state(), CircuitState::Closed);
//! # }
//! ```

pub use circuit::{CircuitMetrics, CircuitState};
pub use classifier::{FailureClassifier, FnClassifier, ServerErrorClassifier};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::{CircuitBreakerEvent, RejectReason};
pub use handle::CircuitHandle;
pub use layer::CircuitBreakerLayer;
pub use registry::{circuit_name, CircuitRegistry};
pub use settings::CircuitBreakerSettings;
pub use telemetry::DEFAULT_TELEMETRY_INTERVAL;

mod circuit;
pub mod classifier;
mod config;
mod error;
mod events;
mod handle;
mod layer;
mod registry;
mod settings;
mod shared;
mod telemetry;

use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::counter;
use opchain_core::{Call, HttpResponse};
use shared::SharedCircuit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};

/// A Tower Service that guards an inner doer with a named circuit.
///
/// # Type Parameters
///
/// - `S`: The inner service type
/// - `C`: The failure classifier type
pub struct CircuitBreaker<S, C = ServerErrorClassifier> {
    inner: S,
    config: Arc<CircuitBreakerConfig<C>>,
    circuit: Arc<SharedCircuit>,
    debug: Arc<AtomicBool>,
}

impl<S, C> CircuitBreaker<S, C> {
    pub(crate) fn new(
        inner: S,
        config: Arc<CircuitBreakerConfig<C>>,
        circuit: Arc<SharedCircuit>,
        debug: Arc<AtomicBool>,
    ) -> Self {
        Self {
            inner,
            config,
            circuit,
            debug,
        }
    }

    /// Returns a handle to the circuit.
    pub fn handle(&self) -> CircuitHandle {
        CircuitHandle::new(Arc::clone(&self.circuit))
    }

    /// Returns the current state of the circuit without locking.
    pub fn state(&self) -> CircuitState {
        self.circuit.state()
    }

    /// Returns true if debug mode is on.
    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Acquire)
    }

    /// Turns debug mode on or off for this breaker and every clone of it.
    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Release);
    }
}

impl<S, C> Clone for CircuitBreaker<S, C>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
            circuit: Arc::clone(&self.circuit),
            debug: Arc::clone(&self.debug),
        }
    }
}

impl<S, C> Service<Call> for CircuitBreaker<S, C>
where
    S: Service<Call, Response = HttpResponse> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    C: FailureClassifier<HttpResponse, S::Error> + Send + Sync + 'static,
{
    type Response = HttpResponse;
    type Error = CircuitBreakerError<S::Error>;
    type Future = BoxFuture<'static, Result<HttpResponse, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, call: Call) -> Self::Future {
        let config = Arc::clone(&self.config);
        let circuit = Arc::clone(&self.circuit);
        let enforcing = !self.debug.load(Ordering::Acquire);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let permit = match circuit.acquire(&config.event_listeners, enforcing).await {
                Ok(permit) => permit,
                Err(reason) => {
                    tracing::debug!(circuit = %config.name, ?reason, "circuit breaker rejected call");

                    #[cfg(feature = "metrics")]
                    counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);

                    return Err(match reason {
                        RejectReason::Open => CircuitBreakerError::OpenCircuit {
                            name: config.name.clone(),
                        },
                        RejectReason::MaxConcurrency(max) => CircuitBreakerError::MaxConcurrency {
                            name: config.name.clone(),
                            max,
                        },
                    });
                }
            };

            let result = match inner.ready().await {
                Ok(ready) => ready.call(call).await,
                Err(error) => Err(error),
            };

            let is_failure = config.classifier.classify(&result);
            circuit
                .record(permit, is_failure, &config.event_listeners)
                .await;

            result.map_err(CircuitBreakerError::Inner)
        })
    }
}
