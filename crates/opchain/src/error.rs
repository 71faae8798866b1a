//! Errors returned to callers of generated operations.

use opchain_circuitbreaker::CircuitBreakerError;
use opchain_core::TransportError;
use thiserror::Error;

/// The failure side of every operation call.
///
/// `E` is the operation's closed set of typed domain errors, one variant per
/// declared non-2xx status code.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// A declared error status whose body decoded into its typed error.
    #[error(transparent)]
    Api(E),

    /// A status code the operation does not declare.
    #[error(transparent)]
    UnknownResponse(#[from] UnknownResponse),

    /// No usable response: transport failure, breaker rejection, deadline or
    /// an undecodable body.
    #[error(transparent)]
    Internal(#[from] InternalError),

    /// The request could not be built; nothing was sent.
    #[error(transparent)]
    Invalid(#[from] BuildError),
}

impl<E> CallError<E> {
    /// Returns the typed domain error, if that is what this is.
    pub fn api(&self) -> Option<&E> {
        match self {
            CallError::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Consumes the error, returning the typed domain error if present.
    pub fn into_api(self) -> Option<E> {
        match self {
            CallError::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the unknown response, if that is what this is.
    pub fn unknown_response(&self) -> Option<&UnknownResponse> {
        match self {
            CallError::UnknownResponse(r) => Some(r),
            _ => None,
        }
    }

    /// Returns true if the call ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CallError::Internal(e) if e.is_timeout())
    }
}

/// A response whose status code the operation does not declare.
///
/// The body is kept verbatim for diagnostics and never decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown response with status: {status} body: {body}")]
pub struct UnknownResponse {
    /// The literal status code.
    pub status: u16,
    /// The raw body, lossily converted to UTF-8.
    pub body: String,
}

/// A call that produced no typed outcome.
#[derive(Debug, Error)]
pub enum InternalError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("circuit {name} is open; call not permitted")]
    CircuitOpen { name: String },

    #[error("circuit {name} rejected call: {max} concurrent requests already in flight")]
    CircuitSaturated { name: String, max: usize },

    #[error("failed to decode {status} response body: {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl InternalError {
    /// Returns true if the call's deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        match self {
            InternalError::Transport(e) => e.is_timeout(),
            InternalError::DeadlineExceeded => true,
            _ => false,
        }
    }

    /// Returns true if the circuit breaker refused the call.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            InternalError::CircuitOpen { .. } | InternalError::CircuitSaturated { .. }
        )
    }
}

impl From<CircuitBreakerError<TransportError>> for InternalError {
    fn from(err: CircuitBreakerError<TransportError>) -> Self {
        match err {
            CircuitBreakerError::OpenCircuit { name } => InternalError::CircuitOpen { name },
            CircuitBreakerError::MaxConcurrency { name, max } => {
                InternalError::CircuitSaturated { name, max }
            }
            CircuitBreakerError::Inner(e) => InternalError::Transport(e),
        }
    }
}

/// A request that failed client-side before any network I/O.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("missing required path parameter {name:?}")]
    MissingPathParam { name: String },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("failed to encode request body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    Request(#[from] http::Error),
}

impl From<url::ParseError> for BuildError {
    fn from(err: url::ParseError) -> Self {
        BuildError::InvalidUrl(err.to_string())
    }
}
