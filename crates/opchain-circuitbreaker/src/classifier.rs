//! Failure classification for circuit breaker decisions.
//!
//! The breaker never sees the HTTP call's own error as its verdict. Instead a
//! [`FailureClassifier`] turns the call's outcome into a success or failure
//! for the circuit's statistics.

use opchain_core::{HttpResponse, TransportError};
use std::sync::Arc;

/// Decides whether a call outcome counts as a failure.
pub trait FailureClassifier<Res, Err>: Send + Sync {
    /// Returns `true` if the result counts toward the circuit's error rate.
    fn classify(&self, result: &Result<Res, Err>) -> bool;
}

/// Counts transport errors and 5xx responses as failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerErrorClassifier;

impl FailureClassifier<HttpResponse, TransportError> for ServerErrorClassifier {
    fn classify(&self, result: &Result<HttpResponse, TransportError>) -> bool {
        match result {
            Ok(response) => response.status().is_server_error(),
            Err(_) => true,
        }
    }
}

/// A failure classifier backed by a closure.
///
/// ```rust
/// use opchain_circuitbreaker::classifier::{FailureClassifier, FnClassifier};
/// use opchain_core::{HttpResponse, TransportError};
///
/// // Deadline expiries are the caller's budget, not the backend's fault.
/// let classifier = FnClassifier::new(|result: &Result<HttpResponse, TransportError>| match result {
///     Ok(response) => response.status().is_server_error(),
///     Err(TransportError::Timeout) => false,
///     Err(_) => true,
/// });
///
/// assert!(!classifier.classify(&Err(TransportError::Timeout)));
/// ```
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: Arc<F>,
}

impl<F> FnClassifier<F> {
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F, Res, Err> FailureClassifier<Res, Err> for FnClassifier<F>
where
    F: Fn(&Result<Res, Err>) -> bool + Send + Sync,
{
    fn classify(&self, result: &Result<Res, Err>) -> bool {
        (self.f)(result)
    }
}
