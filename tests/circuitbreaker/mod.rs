//! Circuit breaker tests.
//!
//! Test organization:
//! - thresholds.rs: volume and error percentage tripping
//! - half_open.rs: trial calls after the sleep window
//! - concurrency.rs: in-flight limits and permit release
//! - debug_mode.rs: observe-only circuits
//! - registry.rs: circuit sharing by name
//! - telemetry.rs: transition stream and background logging

mod half_open;
mod thresholds;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::StatusCode;
use opchain_circuitbreaker::{CircuitBreakerLayer, CircuitBreakerSettings, CircuitRegistry};
use opchain_core::{Call, CallContext, HttpResponse, TransportError};
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

pub fn call() -> Call {
    let request = http::Request::get("http://library.internal/v1/books")
        .body(Bytes::new())
        .unwrap();
    Call::new(CallContext::new().with_operation("getBooks"), request)
}

/// A backend whose status can be changed between calls.
#[derive(Clone)]
pub struct Backend {
    status: Arc<AtomicU16>,
    calls: Arc<AtomicUsize>,
    latency: Duration,
}

impl Backend {
    pub fn new(status: u16) -> Self {
        Self {
            status: Arc::new(AtomicU16::new(status)),
            calls: Arc::new(AtomicUsize::new(0)),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Service<Call> for Backend {
    type Response = HttpResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<HttpResponse, TransportError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _call: Call) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let status = self.status.load(Ordering::SeqCst);
        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            Ok(http::Response::builder()
                .status(StatusCode::from_u16(status).unwrap())
                .body(Bytes::new())
                .unwrap())
        })
    }
}

/// Four calls, half of them failing, open the circuit for one second.
pub fn settings() -> CircuitBreakerSettings {
    CircuitBreakerSettings::DEFAULT
        .with_request_volume_threshold(4)
        .with_error_percent_threshold(50)
        .with_sleep_window(Duration::from_secs(1))
}

/// An enforcing breaker on a private registry.
pub fn enforcing(name: &str, settings: CircuitBreakerSettings) -> CircuitBreakerLayer {
    CircuitBreakerLayer::builder()
        .name(name)
        .registry(Arc::new(CircuitRegistry::new()))
        .settings(settings)
        .debug(false)
        .without_telemetry()
        .build()
}
