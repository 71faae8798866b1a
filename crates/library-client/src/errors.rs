//! Typed error bodies and per-operation error sets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! error_body {
    ($(#[$doc:meta])* $name:ident, $default:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Error)]
        #[error("{}", .message.as_deref().unwrap_or($default))]
        pub struct $name {
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub message: Option<String>,
        }
    };
}

error_body!(
    /// 400: the request was malformed.
    BadRequest,
    "bad request"
);
error_body!(
    /// 401: missing or rejected credentials.
    Unauthorized,
    "unauthorized"
);
error_body!(
    /// 404: no such resource.
    NotFound,
    "not found"
);
error_body!(
    /// 500: the service failed.
    InternalError,
    "internal error"
);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealthCheckError {
    #[error(transparent)]
    BadRequest(BadRequest),
    #[error(transparent)]
    InternalError(InternalError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateBookError {
    #[error(transparent)]
    BadRequest(BadRequest),
    #[error(transparent)]
    InternalError(InternalError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetBookByIdError {
    #[error(transparent)]
    BadRequest(BadRequest),
    #[error(transparent)]
    Unauthorized(Unauthorized),
    #[error(transparent)]
    NotFound(NotFound),
    #[error(transparent)]
    InternalError(InternalError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetBooksError {
    #[error(transparent)]
    BadRequest(BadRequest),
    #[error(transparent)]
    InternalError(InternalError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteBookError {
    #[error(transparent)]
    NotFound(NotFound),
    #[error(transparent)]
    InternalError(InternalError),
}
