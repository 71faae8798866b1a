use thiserror::Error;

/// Errors returned by the `CircuitBreaker` service.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the call was not attempted.
    #[error("circuit {name} is open; call not permitted")]
    OpenCircuit { name: String },

    /// Too many calls were in flight on the circuit.
    #[error("circuit {name} rejected call: {max} concurrent requests in flight")]
    MaxConcurrency { name: String, max: usize },

    /// An error returned by the inner service.
    #[error(transparent)]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns true if the breaker rejected the call without running it.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, CircuitBreakerError::Inner(_))
    }

    /// Returns true if the error indicates the circuit is open.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::OpenCircuit { .. })
    }

    /// Returns the inner error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }
}
