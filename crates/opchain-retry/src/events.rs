use http::Method;
use opchain_core::events::PipelineEvent;
use std::time::{Duration, Instant};

/// Events emitted by the retry decorator.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A retry is about to be made after `delay`.
    Retry {
        source: String,
        timestamp: Instant,
        /// 1-based retry number.
        attempt: usize,
        delay: Duration,
        /// Status of the attempt that triggered the retry.
        status: Option<u16>,
    },
    /// The policy declined to retry the last attempt.
    Completed {
        source: String,
        timestamp: Instant,
        attempts: usize,
        status: Option<u16>,
    },
    /// Every backoff slot was used and the last attempt would still be retried.
    Exhausted {
        source: String,
        timestamp: Instant,
        attempts: usize,
        status: Option<u16>,
    },
    /// The method is never replayed; the policy was not consulted.
    NonIdempotent {
        source: String,
        timestamp: Instant,
        method: Method,
    },
}

impl PipelineEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Completed { .. } => "completed",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::NonIdempotent { .. } => "non_idempotent",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Completed { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::NonIdempotent { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            RetryEvent::Retry { source, .. }
            | RetryEvent::Completed { source, .. }
            | RetryEvent::Exhausted { source, .. }
            | RetryEvent::NonIdempotent { source, .. } => source,
        }
    }
}
