//! Tracing decorator: one client span per attempt, propagated downstream.

use futures::future::BoxFuture;
use http::HeaderValue;
use opchain_core::{Call, HttpResponse, SpanContext, TransportError, TRACEPARENT};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::field::Empty;
use tracing::Instrument;

/// Layer producing [`Traced`] services.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceLayer;

impl TraceLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TraceLayer {
    type Service = Traced<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Traced { inner }
    }
}

/// Starts a span for each attempt and writes its `traceparent` header.
///
/// The span is a child of the call's parent span when one is set on the
/// [`CallContext`](opchain_core::CallContext), otherwise a new trace.
///
/// # Panics
///
/// Panics if the call carries no operation name. Generated operations always
/// set one, so a missing name means the chain was wired by hand incorrectly.
#[derive(Debug, Clone)]
pub struct Traced<S> {
    inner: S,
}

impl<S> Service<Call> for Traced<S>
where
    S: Service<Call, Response = HttpResponse, Error = TransportError>,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<HttpResponse, TransportError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut call: Call) -> Self::Future {
        let Some(operation) = call.context.operation().map(str::to_owned) else {
            panic!("call reached the tracing layer without an operation name");
        };

        let span_context = match call.context.parent_span() {
            Some(parent) => parent.child(),
            None => SpanContext::new_root(),
        };
        match HeaderValue::try_from(span_context.to_traceparent()) {
            Ok(value) => {
                call.request.headers_mut().insert(TRACEPARENT, value);
            }
            Err(e) => {
                let err = TransportError::Propagation(e.to_string());
                return Box::pin(async move { Err(err) });
            }
        }

        let trace_id = format!("{:032x}", span_context.trace_id());
        let span_id = format!("{:016x}", span_context.span_id());
        let span = tracing::info_span!(
            "http.client",
            otel.kind = "client",
            operation = %operation,
            trace_id = %trace_id,
            span_id = %span_id,
            http.method = %call.request.method(),
            http.url = %call.request.uri(),
            http.status_code = Empty,
            otel.status_code = Empty,
        );

        let fut = self.inner.call(call);
        let recorder = span.clone();
        Box::pin(
            async move {
                let result = fut.await;
                match &result {
                    Ok(response) => {
                        recorder.record("http.status_code", response.status().as_u16());
                        let status = if response.status().is_server_error() { "ERROR" } else { "OK" };
                        recorder.record("otel.status_code", status);
                    }
                    Err(_) => {
                        recorder.record("otel.status_code", "ERROR");
                    }
                }
                result
            }
            .instrument(span),
        )
    }
}
