//! Typed events emitted by the retry and circuit breaker layers.
//!
//! Layers publish to a [`Listeners`] set owned by their configuration. The
//! builders register closures on it (`on_retry`, `on_state_transition`, ...).

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// An event emitted by a pipeline layer.
pub trait PipelineEvent: Send + Sync + fmt::Debug {
    /// Short kind, used as a metrics label: `"retry"`, `"state_transition"`.
    fn event_type(&self) -> &'static str;

    fn timestamp(&self) -> Instant;

    /// Name of the retry layer or circuit that emitted the event.
    fn source(&self) -> &str;
}

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Callbacks subscribed to one layer's events, called in registration order.
pub struct Listeners<E> {
    callbacks: Vec<Callback<E>>,
}

impl<E: PipelineEvent> Listeners<E> {
    pub fn new() -> Self {
        Self { callbacks: Vec::new() }
    }

    /// Subscribes `f` to every event.
    pub fn add<F>(&mut self, f: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(f));
    }

    /// Calls every callback with `event`.
    ///
    /// Runs on the request path. A panicking callback is skipped and does
    /// not reach the caller or the callbacks after it.
    pub fn emit(&self, event: &E) {
        for callback in &self.callbacks {
            let _ = catch_unwind(AssertUnwindSafe(|| callback(event)));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<E> Clone for Listeners<E> {
    fn clone(&self) -> Self {
        Self {
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<E: PipelineEvent> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
