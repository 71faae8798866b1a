//! The retry policy catalog.
//!
//! Every built-in policy retries only 5xx responses to idempotent requests
//! and answers "do not retry" when the transport produced no response.

use crate::backoff::{Backoff, ExponentialBackoff, FixedBackoff};
use opchain_core::{is_retryable_method, HttpRequest, HttpResponse, RetryPolicy, TransportError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default delay of [`SingleRetryPolicy`].
pub const SINGLE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default base delay of [`ExponentialRetryPolicy`].
pub const EXPONENTIAL_BASE_DELAY: Duration = Duration::from_millis(100);

/// Total attempts made by [`ExponentialRetryPolicy`], the first one included.
pub const EXPONENTIAL_MAX_ATTEMPTS: usize = 5;

/// Jitter factor of [`ExponentialRetryPolicy`].
pub const EXPONENTIAL_JITTER: f64 = 0.05;

/// True for a 5xx response to a method that may be replayed.
pub fn is_retryable_server_error(request: &HttpRequest, response: Option<&HttpResponse>) -> bool {
    is_retryable_method(request.method())
        && response.is_some_and(|response| response.status().is_server_error())
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoRetryPolicy;

impl RetryPolicy for NoRetryPolicy {
    fn backoffs(&self) -> Vec<Duration> {
        Vec::new()
    }

    fn should_retry(&self, _: &HttpRequest, _: Option<&HttpResponse>, _: Option<&TransportError>) -> bool {
        false
    }
}

/// One retry of a 5xx response after a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleRetryPolicy {
    delay: Duration,
}

impl SingleRetryPolicy {
    /// Creates the policy with a custom delay.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SingleRetryPolicy {
    fn default() -> Self {
        Self::with_delay(SINGLE_RETRY_DELAY)
    }
}

impl RetryPolicy for SingleRetryPolicy {
    fn backoffs(&self) -> Vec<Duration> {
        vec![self.delay]
    }

    fn should_retry(
        &self,
        request: &HttpRequest,
        response: Option<&HttpResponse>,
        _: Option<&TransportError>,
    ) -> bool {
        is_retryable_server_error(request, response)
    }
}

/// Up to five attempts on 5xx responses, doubling the delay from 100ms with
/// ±5% jitter (100ms, 200ms, 400ms, 800ms).
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialRetryPolicy {
    backoff: ExponentialBackoff,
}

impl ExponentialRetryPolicy {
    /// Creates the policy from an explicit backoff schedule.
    pub fn with_backoff(backoff: ExponentialBackoff) -> Self {
        Self { backoff }
    }
}

impl Default for ExponentialRetryPolicy {
    fn default() -> Self {
        Self::with_backoff(
            ExponentialBackoff::new(EXPONENTIAL_BASE_DELAY, EXPONENTIAL_MAX_ATTEMPTS - 1)
                .jitter(EXPONENTIAL_JITTER),
        )
    }
}

impl RetryPolicy for ExponentialRetryPolicy {
    fn backoffs(&self) -> Vec<Duration> {
        self.backoff.schedule()
    }

    fn should_retry(
        &self,
        request: &HttpRequest,
        response: Option<&HttpResponse>,
        _: Option<&TransportError>,
    ) -> bool {
        is_retryable_server_error(request, response)
    }
}

/// A fixed number of immediate retries while the status is 5xx.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRetryPolicy {
    retries: usize,
}

impl CountRetryPolicy {
    /// Creates a policy allowing `retries` retries.
    pub fn new(retries: usize) -> Self {
        Self { retries }
    }

    /// Returns the configured retry count.
    pub fn retries(&self) -> usize {
        self.retries
    }
}

impl RetryPolicy for CountRetryPolicy {
    fn backoffs(&self) -> Vec<Duration> {
        FixedBackoff::new(Duration::ZERO, self.retries).schedule()
    }

    fn should_retry(
        &self,
        request: &HttpRequest,
        response: Option<&HttpResponse>,
        _: Option<&TransportError>,
    ) -> bool {
        is_retryable_server_error(request, response)
    }
}

type Predicate =
    dyn Fn(&HttpRequest, Option<&HttpResponse>, Option<&TransportError>) -> bool + Send + Sync;

/// A policy assembled from any backoff schedule and predicate.
///
/// Built with [`RetryPolicyBuilder`].
#[derive(Clone)]
pub struct CustomRetryPolicy {
    backoff: Arc<dyn Backoff>,
    predicate: Arc<Predicate>,
}

impl fmt::Debug for CustomRetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRetryPolicy")
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy for CustomRetryPolicy {
    fn backoffs(&self) -> Vec<Duration> {
        self.backoff.schedule()
    }

    fn should_retry(
        &self,
        request: &HttpRequest,
        response: Option<&HttpResponse>,
        error: Option<&TransportError>,
    ) -> bool {
        (self.predicate)(request, response, error)
    }
}

/// Builder for [`CustomRetryPolicy`].
///
/// Defaults to a single retry after one second on idempotent 5xx responses.
pub struct RetryPolicyBuilder {
    backoff: Arc<dyn Backoff>,
    predicate: Arc<Predicate>,
}

impl RetryPolicyBuilder {
    /// Creates a builder with the default schedule and predicate.
    pub fn new() -> Self {
        Self {
            backoff: Arc::new(FixedBackoff::new(SINGLE_RETRY_DELAY, 1)),
            predicate: Arc::new(|request, response, _| is_retryable_server_error(request, response)),
        }
    }

    /// Sets the backoff schedule.
    pub fn backoff<B>(mut self, backoff: B) -> Self
    where
        B: Backoff + 'static,
    {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Sets the retry predicate.
    ///
    /// The decorator only consults the predicate for idempotent methods.
    /// Returning true when `response` is `None` opts in to retrying
    /// transport errors.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&HttpRequest, Option<&HttpResponse>, Option<&TransportError>) -> bool
            + Send
            + Sync
            + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Retries 5xx responses and transport errors.
    pub fn retry_on_network_errors(self) -> Self {
        self.retry_if(|request, response, error| {
            is_retryable_server_error(request, response)
                || (error.is_some() && is_retryable_method(request.method()))
        })
    }

    /// Builds the policy.
    pub fn build(self) -> CustomRetryPolicy {
        CustomRetryPolicy {
            backoff: self.backoff,
            predicate: self.predicate,
        }
    }
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
