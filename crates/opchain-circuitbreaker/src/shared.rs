use crate::circuit::{Admission, Circuit, CircuitMetrics, CircuitState, Emitter};
use crate::events::{CircuitBreakerEvent, RejectReason};
use crate::settings::CircuitBreakerSettings;
use arc_swap::ArcSwap;
use opchain_core::events::Listeners;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Instant;
use tokio::sync::{broadcast, Mutex};

const TELEMETRY_CAPACITY: usize = 64;

static NO_LISTENERS: LazyLock<Listeners<CircuitBreakerEvent>> =
    LazyLock::new(Listeners::new);

/// One named circuit, shared by every breaker that uses its name.
pub(crate) struct SharedCircuit {
    pub(crate) name: String,
    settings: ArcSwap<CircuitBreakerSettings>,
    circuit: Mutex<Circuit>,
    state_atomic: Arc<AtomicU8>,
    in_flight: AtomicUsize,
    trial_in_flight: AtomicBool,
    telemetry: broadcast::Sender<CircuitBreakerEvent>,
}

impl SharedCircuit {
    pub(crate) fn new(name: String, settings: CircuitBreakerSettings) -> Self {
        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            name,
            settings: ArcSwap::from_pointee(settings),
            circuit: Mutex::new(Circuit::new(Arc::clone(&state_atomic))),
            state_atomic,
            in_flight: AtomicUsize::new(0),
            trial_in_flight: AtomicBool::new(false),
            telemetry: broadcast::channel(TELEMETRY_CAPACITY).0,
        }
    }

    pub(crate) fn settings(&self) -> Arc<CircuitBreakerSettings> {
        self.settings.load_full()
    }

    pub(crate) fn set_settings(&self, settings: CircuitBreakerSettings) {
        self.settings.store(Arc::new(settings));
    }

    pub(crate) fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<CircuitBreakerEvent> {
        self.telemetry.subscribe()
    }

    fn emitter<'a>(&'a self, listeners: &'a Listeners<CircuitBreakerEvent>) -> Emitter<'a> {
        Emitter {
            name: &self.name,
            listeners,
            telemetry: &self.telemetry,
        }
    }

    /// Admits a call, or explains why not.
    ///
    /// With `enforcing` off, a rejected call is let through anyway and counted
    /// like any other.
    pub(crate) async fn acquire(
        self: &Arc<Self>,
        listeners: &Listeners<CircuitBreakerEvent>,
        enforcing: bool,
    ) -> Result<Permit, RejectReason> {
        let settings = self.settings();
        let mut circuit = self.circuit.lock().await;
        let emitter = self.emitter(listeners);

        let admission = circuit.admit(
            &settings,
            self.in_flight.load(Ordering::Acquire),
            &self.trial_in_flight,
            &emitter,
        );

        let trial = match admission {
            Admission::Permitted => false,
            Admission::Trial => true,
            Admission::Rejected(reason) if enforcing => {
                emitter.emit(CircuitBreakerEvent::CallRejected {
                    source: self.name.clone(),
                    timestamp: Instant::now(),
                    reason,
                });
                return Err(reason);
            }
            Admission::Rejected(reason) => {
                emitter.emit(CircuitBreakerEvent::RejectionBypassed {
                    source: self.name.clone(),
                    timestamp: Instant::now(),
                    reason,
                });
                false
            }
        };

        emitter.emit(CircuitBreakerEvent::CallPermitted {
            source: self.name.clone(),
            timestamp: Instant::now(),
            state: circuit.state(),
        });

        self.in_flight.fetch_add(1, Ordering::AcqRel);
        Ok(Permit {
            circuit: Arc::clone(self),
            trial,
            started: Instant::now(),
        })
    }

    /// Records the outcome of an admitted call and releases its permit.
    pub(crate) async fn record(
        &self,
        mut permit: Permit,
        is_failure: bool,
        listeners: &Listeners<CircuitBreakerEvent>,
    ) {
        let settings = self.settings();
        let duration = permit.started.elapsed();
        let mut circuit = self.circuit.lock().await;
        circuit.record(
            &settings,
            is_failure,
            permit.trial,
            duration,
            &self.emitter(listeners),
        );
        if permit.trial {
            self.trial_in_flight.store(false, Ordering::Release);
            permit.trial = false;
        }
    }

    pub(crate) async fn metrics(&self) -> CircuitMetrics {
        let settings = self.settings();
        let mut circuit = self.circuit.lock().await;
        circuit.metrics(&settings, self.in_flight.load(Ordering::Acquire))
    }

    pub(crate) async fn force_open(&self) {
        let mut circuit = self.circuit.lock().await;
        circuit.force_open(&self.emitter(&NO_LISTENERS));
    }

    pub(crate) async fn force_closed(&self) {
        let mut circuit = self.circuit.lock().await;
        circuit.force_closed(&self.emitter(&NO_LISTENERS));
    }

    pub(crate) async fn reset(&self) {
        let mut circuit = self.circuit.lock().await;
        circuit.reset(&self.emitter(&NO_LISTENERS));
        self.trial_in_flight.store(false, Ordering::Release);
    }
}

/// An admitted call's slot on the circuit.
///
/// Dropping the permit without recording (the call's future was dropped)
/// releases its concurrency slot, and its trial slot when it held one.
pub(crate) struct Permit {
    circuit: Arc<SharedCircuit>,
    trial: bool,
    started: Instant,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.circuit.in_flight.fetch_sub(1, Ordering::AcqRel);
        if self.trial {
            self.circuit.trial_in_flight.store(false, Ordering::Release);
        }
    }
}
