//! Background logging of circuit state.
//!
//! One task per circuit name follows the circuit's state-transition stream
//! and logs a snapshot on every transition and on a fixed cadence. The task
//! holds only a weak reference, so it ends once the circuit is dropped.

use crate::events::CircuitBreakerEvent;
use crate::shared::SharedCircuit;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

/// Default cadence of periodic snapshots.
pub const DEFAULT_TELEMETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Delay before a dropped subscription is re-established.
pub(crate) const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Spawns the telemetry task. Returns false if no tokio runtime is running.
pub(crate) fn spawn(circuit: &Arc<SharedCircuit>, interval: Duration) -> bool {
    let handle = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            tracing::warn!(
                circuit = %circuit.name,
                "no tokio runtime; circuit telemetry disabled"
            );
            return false;
        }
    };
    handle.spawn(run(Arc::downgrade(circuit), interval));
    true
}

async fn run(circuit: Weak<SharedCircuit>, interval: Duration) {
    loop {
        let (name, mut events) = match circuit.upgrade() {
            Some(circuit) => (circuit.name.clone(), circuit.subscribe()),
            None => return,
        };
        tracing::debug!(circuit = %name, "circuit telemetry subscribed");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(CircuitBreakerEvent::StateTransition { from_state, to_state, .. }) => {
                        let Some(circuit) = circuit.upgrade() else { return };
                        let metrics = circuit.metrics().await;
                        tracing::info!(
                            circuit = %name,
                            from = from_state.as_str(),
                            to = to_state.as_str(),
                            total_calls = metrics.total_calls,
                            error_count = metrics.error_count,
                            error_percentage = metrics.error_percentage,
                            in_flight = metrics.in_flight,
                            "circuit state changed"
                        );
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(circuit = %name, skipped, "circuit telemetry lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = ticker.tick() => {
                    let Some(circuit) = circuit.upgrade() else { return };
                    let metrics = circuit.metrics().await;
                    tracing::debug!(
                        circuit = %name,
                        state = metrics.state.as_str(),
                        total_calls = metrics.total_calls,
                        error_count = metrics.error_count,
                        error_percentage = metrics.error_percentage,
                        in_flight = metrics.in_flight,
                        "circuit snapshot"
                    );
                }
            }
        }

        tracing::warn!(
            circuit = %name,
            retry_in_ms = RESUBSCRIBE_DELAY.as_millis() as u64,
            "circuit telemetry stream closed; resubscribing"
        );
        tokio::time::sleep(RESUBSCRIBE_DELAY).await;
    }
}
