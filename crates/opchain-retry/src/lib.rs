//! Retry decorator for the opchain request pipeline.
//!
//! [`Retry`] wraps any doer (`Service<Call, Response = HttpResponse>`) and
//! replays a call according to a [`RetryPolicy`]: a backoff schedule plus a
//! predicate consulted after every attempt.
//!
//! - The effective policy is the call's override when its
//!   [`CallContext`](opchain_core::CallContext) carries one, otherwise the
//!   layer's default policy.
//! - POST and PATCH are never replayed. Their policy is never consulted.
//! - Attempts are strictly sequential. The last response or error observed is
//!   returned.
//! - Dropping the returned future cancels the in-flight attempt and any
//!   pending backoff sleep.
//!
//! # Policy catalog
//!
//! | Policy | Schedule | Retries |
//! |---|---|---|
//! | [`NoRetryPolicy`] | none | never |
//! | [`SingleRetryPolicy`] | 1s | idempotent 5xx |
//! | [`ExponentialRetryPolicy`] | 100ms, 200ms, 400ms, 800ms ±5% | idempotent 5xx |
//! | [`CountRetryPolicy`] | `n` × 0s | idempotent 5xx |
//! | [`CustomRetryPolicy`] | any [`Backoff`] | any predicate |
//!
//! # Example
//!
//! ```
//! use opchain_core::{Call, CallContext, HttpResponse, TransportError};
//! use opchain_retry::{CountRetryPolicy, RetryLayer};
//! use tower::{Layer, ServiceExt};
//!
//! # async fn example() -> Result<(), TransportError> {
//! let transport = tower::service_fn(|_call: Call| async {
//!     Ok::<_, TransportError>(HttpResponse::new(bytes::Bytes::new()))
//! });
//!
//! let service = RetryLayer::builder()
//!     .name("library")
//!     .policy(CountRetryPolicy::new(2))
//!     .build()
//!     .layer(transport);
//!
//! let request = http::Request::get("http://localhost/v1/books").body(bytes::Bytes::new()).unwrap();
//! let response = service.oneshot(Call::new(CallContext::new(), request)).await?;
//! assert_eq!(response.status(), 200);
//! # Ok(())
//! # }
//! ```

mod backoff;
mod config;
mod events;
mod layer;
mod policy;

pub use backoff::{Backoff, ExponentialBackoff, FixedBackoff};
pub use config::{RetryConfig, RetryConfigBuilder, RetryPolicyHandle};
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use policy::{
    is_retryable_server_error, CountRetryPolicy, CustomRetryPolicy, ExponentialRetryPolicy,
    NoRetryPolicy, RetryPolicyBuilder, SingleRetryPolicy, EXPONENTIAL_BASE_DELAY,
    EXPONENTIAL_JITTER, EXPONENTIAL_MAX_ATTEMPTS, SINGLE_RETRY_DELAY,
};

use futures::future::BoxFuture;
use opchain_core::{is_retryable_method, Call, HttpResponse, RetryPolicy, TransportError};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Service, ServiceExt};

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "metrics")]
use opchain_core::PipelineEvent;

/// A Tower [`Service`] that replays idempotent calls according to a
/// [`RetryPolicy`].
pub struct Retry<S> {
    inner: S,
    config: Arc<RetryConfig>,
}

impl<S> Retry<S> {
    /// Creates a new `Retry` service wrapping the given service.
    pub fn new(inner: S, config: Arc<RetryConfig>) -> Self {
        Self { inner, config }
    }

    /// Returns the handle to the default policy.
    pub fn policy_handle(&self) -> &RetryPolicyHandle {
        self.config.policy_handle()
    }
}

impl<S> Clone for Retry<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

fn status_of(result: &Result<HttpResponse, TransportError>) -> Option<u16> {
    result.as_ref().ok().map(|response| response.status().as_u16())
}

impl<S> Service<Call> for Retry<S>
where
    S: Service<Call, Response = HttpResponse, Error = TransportError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<HttpResponse, TransportError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: Call) -> Self::Future {
        let mut service = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let policy: Arc<dyn RetryPolicy> = match call.context.retry_policy() {
                Some(policy) => Arc::clone(policy),
                None => config.policy.get(),
            };

            let mut result = service.ready().await?.call(call.clone()).await;
            let mut attempts = 1;

            #[cfg(feature = "metrics")]
            counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

            if !is_retryable_method(call.method()) {
                config.event_listeners.emit(&RetryEvent::NonIdempotent {
                    source: config.name.clone(),
                    timestamp: Instant::now(),
                    method: call.method().clone(),
                });

                #[cfg(feature = "metrics")]
                counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "non_idempotent")
                    .increment(1);

                return result;
            }

            for delay in policy.backoffs() {
                let retry = match &result {
                    Ok(response) => policy.should_retry(&call.request, Some(response), None),
                    Err(error) => policy.should_retry(&call.request, None, Some(error)),
                };
                if !retry {
                    config.event_listeners.emit(&RetryEvent::Completed {
                        source: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts,
                        status: status_of(&result),
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "completed")
                        .increment(1);

                    return result;
                }

                config.event_listeners.emit(&RetryEvent::Retry {
                    source: config.name.clone(),
                    timestamp: Instant::now(),
                    attempt: attempts,
                    delay,
                    status: status_of(&result),
                });

                tracing::debug!(
                    retry = %config.name,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    status = ?status_of(&result),
                    "retrying call"
                );

                // Release the previous response before sleeping.
                drop(result);
                tokio::time::sleep(delay).await;

                attempts += 1;
                result = match service.ready().await {
                    Ok(ready) => ready.call(call.clone()).await,
                    Err(error) => Err(error),
                };

                #[cfg(feature = "metrics")]
                counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);
            }

            // The schedule ran out; the call is exhausted only if the policy
            // still wants another attempt for the final result.
            let still_failing = match &result {
                Ok(response) => policy.should_retry(&call.request, Some(response), None),
                Err(error) => policy.should_retry(&call.request, None, Some(error)),
            };
            let event = if still_failing {
                RetryEvent::Exhausted {
                    source: config.name.clone(),
                    timestamp: Instant::now(),
                    attempts,
                    status: status_of(&result),
                }
            } else {
                RetryEvent::Completed {
                    source: config.name.clone(),
                    timestamp: Instant::now(),
                    attempts,
                    status: status_of(&result),
                }
            };
            config.event_listeners.emit(&event);

            #[cfg(feature = "metrics")]
            counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => event.event_type())
                .increment(1);

            result
        })
    }
}
