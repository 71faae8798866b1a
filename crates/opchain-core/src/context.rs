//! Per-call configuration threaded through the doer chain.

use crate::policy::RetryPolicy;
use crate::trace_context::SpanContext;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Typed per-call configuration.
///
/// A `CallContext` is created for every logical call, travels with the
/// [`Call`](crate::Call) through every decorator and is dropped when the call
/// completes. Dropping the call's future is the cancellation signal: it aborts
/// the in-flight exchange and any pending backoff sleep.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    operation: Option<Cow<'static, str>>,
    retry_policy: Option<Arc<dyn RetryPolicy>>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    parent_span: Option<SpanContext>,
}

impl CallContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the operation name used for tracing and logging.
    pub fn with_operation(mut self, operation: impl Into<Cow<'static, str>>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Sets the operation name only if none is present yet.
    pub fn or_operation(mut self, operation: &'static str) -> Self {
        if self.operation.is_none() {
            self.operation = Some(Cow::Borrowed(operation));
        }
        self
    }

    /// Returns the operation name, if set.
    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    /// Overrides the client's retry policy for this call only.
    pub fn with_retry_policy<P>(self, policy: P) -> Self
    where
        P: RetryPolicy + 'static,
    {
        self.with_shared_retry_policy(Arc::new(policy))
    }

    /// Overrides the client's retry policy for this call with a shared policy.
    pub fn with_shared_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Returns the per-call retry policy override, if any.
    pub fn retry_policy(&self) -> Option<&Arc<dyn RetryPolicy>> {
        self.retry_policy.as_ref()
    }

    /// Overrides the client's default timeout for this call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the per-call timeout override, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sets an absolute deadline for the whole call, retries included.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns the absolute deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Makes spans started for this call children of `parent`.
    pub fn with_parent_span(mut self, parent: SpanContext) -> Self {
        self.parent_span = Some(parent);
        self
    }

    /// Returns the parent span, if any.
    pub fn parent_span(&self) -> Option<&SpanContext> {
        self.parent_span.as_ref()
    }

    /// Resolves the deadline that applies to this call.
    ///
    /// The per-call timeout replaces `default_timeout`; the resulting relative
    /// timeout and the explicit deadline compose so that the tighter one wins.
    /// A zero default timeout means no default.
    pub fn effective_deadline(&self, default_timeout: Option<Duration>, now: Instant) -> Option<Instant> {
        let default_timeout = default_timeout.filter(|t| !t.is_zero());
        let relative = self
            .timeout
            .or(default_timeout)
            .and_then(|t| now.checked_add(t));
        match (self.deadline, relative) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
