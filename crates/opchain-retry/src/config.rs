use crate::events::RetryEvent;
use crate::policy::ExponentialRetryPolicy;
use arc_swap::ArcSwap;
use http::Method;
use opchain_core::events::Listeners;
use opchain_core::RetryPolicy;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A swappable default retry policy.
///
/// Clones share the same slot, so a handle kept by the client can replace
/// the policy used by an already-built retry layer. Calls in flight keep the
/// policy they started with.
#[derive(Clone)]
pub struct RetryPolicyHandle {
    slot: Arc<ArcSwap<Arc<dyn RetryPolicy>>>,
}

impl RetryPolicyHandle {
    /// Creates a handle holding `policy`.
    pub fn new(policy: Arc<dyn RetryPolicy>) -> Self {
        Self {
            slot: Arc::new(ArcSwap::from_pointee(policy)),
        }
    }

    /// Returns the current policy.
    pub fn get(&self) -> Arc<dyn RetryPolicy> {
        Arc::clone(&**self.slot.load())
    }

    /// Replaces the policy.
    pub fn set<P>(&self, policy: P)
    where
        P: RetryPolicy + 'static,
    {
        self.set_shared(Arc::new(policy));
    }

    /// Replaces the policy with a shared one.
    pub fn set_shared(&self, policy: Arc<dyn RetryPolicy>) {
        self.slot.store(Arc::new(policy));
    }
}

impl fmt::Debug for RetryPolicyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RetryPolicyHandle").field(&self.get()).finish()
    }
}

/// Configuration for the retry decorator.
pub struct RetryConfig {
    pub(crate) policy: RetryPolicyHandle,
    pub(crate) event_listeners: Listeners<RetryEvent>,
    pub(crate) name: String,
}

impl RetryConfig {
    /// Creates a new builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Returns the handle to the default policy.
    pub fn policy_handle(&self) -> &RetryPolicyHandle {
        &self.policy
    }

    /// Returns the instance name used in events and logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    policy: Option<RetryPolicyHandle>,
    event_listeners: Listeners<RetryEvent>,
    name: String,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - policy: [`ExponentialRetryPolicy`]
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            policy: None,
            event_listeners: Listeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the default policy, used when a call carries no override.
    pub fn policy<P>(self, policy: P) -> Self
    where
        P: RetryPolicy + 'static,
    {
        self.shared_policy(Arc::new(policy))
    }

    /// Sets the default policy from a shared instance.
    pub fn shared_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.policy = Some(RetryPolicyHandle::new(policy));
        self
    }

    /// Reads the default policy from an existing handle.
    pub fn policy_handle(mut self, handle: RetryPolicyHandle) -> Self {
        self.policy = Some(handle);
        self
    }

    /// Sets the name for this retry instance (used in events).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked before each retry.
    ///
    /// Receives the 1-based retry number and the delay about to be slept.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        });
        self
    }

    /// Registers a callback invoked when the policy stops retrying.
    ///
    /// Receives the total number of attempts, the first one included.
    pub fn on_completed<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let RetryEvent::Completed { attempts, .. } = event {
                f(*attempts);
            }
        });
        self
    }

    /// Registers a callback invoked when every backoff slot was used.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        });
        self
    }

    /// Registers a callback invoked for POST and PATCH calls, which are
    /// never retried.
    pub fn on_non_idempotent<F>(mut self, f: F) -> Self
    where
        F: Fn(&Method) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let RetryEvent::NonIdempotent { method, .. } = event {
                f(method);
            }
        });
        self
    }

    /// Builds the retry layer.
    pub fn build(self) -> crate::RetryLayer {
        let policy = self
            .policy
            .unwrap_or_else(|| RetryPolicyHandle::new(Arc::new(ExponentialRetryPolicy::default())));

        crate::RetryLayer::new(RetryConfig {
            policy,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}
