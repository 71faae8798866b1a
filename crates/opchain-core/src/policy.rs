use crate::call::{HttpRequest, HttpResponse};
use crate::error::TransportError;
use http::Method;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether, and how often, a request is replayed.
///
/// A policy is a backoff schedule plus a predicate. The schedule's length
/// bounds the number of retries; the predicate is consulted after each
/// attempt. Policies hold no per-call state and are shared across
/// concurrent calls.
///
/// The retry decorator never consults a policy for POST or PATCH requests.
pub trait RetryPolicy: fmt::Debug + Send + Sync {
    /// Delays to wait before each retry, in order.
    fn backoffs(&self) -> Vec<Duration>;

    /// Returns true if another attempt should be made.
    ///
    /// `response` is `None` when the transport failed and `error` carries the
    /// reason. Implementations must treat a missing response as "do not
    /// retry" unless they deliberately retry network errors.
    fn should_retry(
        &self,
        request: &HttpRequest,
        response: Option<&HttpResponse>,
        error: Option<&TransportError>,
    ) -> bool;
}

impl<P> RetryPolicy for Arc<P>
where
    P: RetryPolicy + ?Sized,
{
    fn backoffs(&self) -> Vec<Duration> {
        (**self).backoffs()
    }

    fn should_retry(
        &self,
        request: &HttpRequest,
        response: Option<&HttpResponse>,
        error: Option<&TransportError>,
    ) -> bool {
        (**self).should_retry(request, response, error)
    }
}

/// Returns false for methods that must never be replayed (POST, PATCH).
pub fn is_retryable_method(method: &Method) -> bool {
    *method != Method::POST && *method != Method::PATCH
}
