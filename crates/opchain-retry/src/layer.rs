use crate::config::{RetryConfig, RetryConfigBuilder, RetryPolicyHandle};
use crate::Retry;
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that wraps a doer with the retry decorator.
///
/// ```
/// use opchain_retry::{RetryLayer, SingleRetryPolicy};
///
/// let layer = RetryLayer::builder()
///     .name("library")
///     .policy(SingleRetryPolicy::default())
///     .on_retry(|attempt, delay| {
///         tracing::debug!(attempt, ?delay, "retrying");
///     })
///     .build();
/// # let _ = layer;
/// ```
#[derive(Clone)]
pub struct RetryLayer {
    config: Arc<RetryConfig>,
}

impl RetryLayer {
    /// Creates a new `RetryLayer` with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a retry layer.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Returns the handle to the default policy.
    pub fn policy_handle(&self) -> &RetryPolicyHandle {
        self.config.policy_handle()
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = Retry<S>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, Arc::clone(&self.config))
    }
}
