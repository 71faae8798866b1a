use thiserror::Error;

/// A failure where no HTTP response was obtained.
///
/// Status codes are never interpreted at this level; a 5xx response is a
/// successful exchange as far as the transport is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection, DNS, TLS or protocol failure reported by the HTTP stack.
    #[error("{0}")]
    Network(String),

    /// The call's deadline elapsed before a response was read.
    #[error("request deadline exceeded")]
    Timeout,

    /// The request could not be handed to the HTTP stack.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Trace propagation headers could not be written to the request.
    #[error("failed to inject trace headers: {0}")]
    Propagation(String),
}

impl TransportError {
    /// Returns true if the error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}
