use crate::handle::CircuitHandle;
use crate::settings::CircuitBreakerSettings;
use crate::shared::SharedCircuit;
use crate::telemetry;
use dashmap::{DashMap, DashSet};
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Derives a circuit name from a service name and its base address.
///
/// The name is `<service>-<first 6 hex chars of sha256(base_url)>`, so every
/// client built against the same backend lands on the same circuit.
pub fn circuit_name(service: &str, base_url: &str) -> String {
    let digest = hex::encode(Sha256::digest(base_url.as_bytes()));
    format!("{service}-{}", &digest[..6])
}

/// Process-wide table of named circuits.
///
/// The first breaker to use a name creates the circuit with its settings.
/// Later breakers reuse the circuit and its current settings.
#[derive(Default)]
pub struct CircuitRegistry {
    circuits: DashMap<String, Arc<SharedCircuit>>,
    telemetry: DashSet<String>,
}

impl CircuitRegistry {
    /// Creates an empty registry, independent of the global one.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registry shared by the whole process.
    pub fn global() -> Arc<CircuitRegistry> {
        static GLOBAL: OnceLock<Arc<CircuitRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(CircuitRegistry::new())))
    }

    pub(crate) fn get_or_create(
        &self,
        name: &str,
        settings: &CircuitBreakerSettings,
    ) -> Arc<SharedCircuit> {
        let entry = self
            .circuits
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(circuit = name, ?settings, "registering circuit");
                Arc::new(SharedCircuit::new(name.to_string(), settings.clone()))
            });
        Arc::clone(entry.value())
    }

    /// Returns a handle to a registered circuit.
    pub fn get(&self, name: &str) -> Option<CircuitHandle> {
        self.circuits
            .get(name)
            .map(|entry| CircuitHandle::new(Arc::clone(entry.value())))
    }

    /// Replaces the settings of a registered circuit. Returns false if no
    /// circuit has that name.
    pub fn configure(&self, name: &str, settings: CircuitBreakerSettings) -> bool {
        match self.circuits.get(name) {
            Some(entry) => {
                entry.value().set_settings(settings);
                true
            }
            None => false,
        }
    }

    /// Returns the names of all registered circuits.
    pub fn names(&self) -> Vec<String> {
        self.circuits.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Forgets a circuit. Breakers already holding it keep working; its
    /// telemetry task stops once they are gone.
    pub fn remove(&self, name: &str) -> bool {
        self.telemetry.remove(name);
        self.circuits.remove(name).is_some()
    }

    /// Starts the telemetry task for a circuit unless one already runs.
    pub(crate) fn start_telemetry(&self, circuit: &Arc<SharedCircuit>, interval: Duration) {
        if !self.telemetry.insert(circuit.name.clone()) {
            return;
        }
        if !telemetry::spawn(circuit, interval) {
            self.telemetry.remove(&circuit.name);
        }
    }
}

impl std::fmt::Debug for CircuitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitRegistry")
            .field("circuits", &self.names())
            .finish()
    }
}
