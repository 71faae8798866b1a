//! Retry decorator tests.
//!
//! Test organization:
//! - policies.rs: the policy catalog against scripted backends
//! - backoff.rs: delays between attempts, in paused time
//! - idempotency.rs: POST and PATCH go out once
//! - overrides.rs: per-call and runtime policy changes
//! - events.rs: retry listeners

mod backoff;
mod events;
mod idempotency;
mod overrides;

use bytes::Bytes;
use futures::future::{ready, Ready};
use http::{Method, StatusCode};
use opchain_core::{Call, CallContext, HttpResponse, TransportError};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::time::Instant;
use tower::Service;

pub fn call(method: Method) -> Call {
    call_with(method, CallContext::new())
}

pub fn call_with(method: Method, context: CallContext) -> Call {
    let request = http::Request::builder()
        .method(method)
        .uri("http://library.internal/v1/books")
        .body(Bytes::new())
        .unwrap();
    Call::new(context.or_operation("getBooks"), request)
}

/// One scripted answer of a [`Scripted`] backend.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Status(u16),
    ConnectionReset,
}

/// A backend answering a fixed script, repeating the last step forever.
///
/// Records the instant of every attempt.
#[derive(Clone)]
pub struct Scripted {
    steps: Arc<Vec<Step>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
}

impl Scripted {
    pub fn statuses(statuses: &[u16]) -> Self {
        Self::new(statuses.iter().copied().map(Step::Status).collect())
    }

    pub fn new(steps: Vec<Step>) -> Self {
        assert!(!steps.is_empty());
        Self {
            steps: Arc::new(steps),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Time elapsed between consecutive attempts.
    pub fn gaps(&self) -> Vec<std::time::Duration> {
        let attempts = self.attempts.lock().unwrap();
        attempts.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

impl Service<Call> for Scripted {
    type Response = HttpResponse;
    type Error = TransportError;
    type Future = Ready<Result<HttpResponse, TransportError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _call: Call) -> Self::Future {
        let index = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(Instant::now());
            attempts.len() - 1
        };
        let step = self.steps[index.min(self.steps.len() - 1)];
        ready(match step {
            Step::Status(status) => Ok(http::Response::builder()
                .status(StatusCode::from_u16(status).unwrap())
                .body(Bytes::new())
                .unwrap()),
            Step::ConnectionReset => Err(TransportError::Network("connection reset by peer".to_string())),
        })
    }
}
