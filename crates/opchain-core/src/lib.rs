//! Core infrastructure for opchain.
//!
//! This crate provides the types every layer of the request pipeline agrees on:
//! - [`Call`]: one buffered HTTP request plus its per-call [`CallContext`]
//! - [`TransportError`]: failures where no HTTP response was obtained
//! - [`RetryPolicy`]: the contract between callers and the retry decorator
//! - [`SpanContext`]: W3C trace-context identifiers used for propagation
//! - Event system for observability of the resilience layers
//!
//! A "doer" in opchain is any `tower::Service<Call, Response = HttpResponse>`.
//! The transport, tracing, retry and circuit-breaker decorators all share that
//! shape, so they compose with plain `Layer`s.

pub mod call;
pub mod context;
pub mod error;
pub mod events;
pub mod policy;
pub mod trace_context;

pub use call::{clone_request, Call, HttpRequest, HttpResponse};
pub use context::CallContext;
pub use error::TransportError;
pub use events::{Listeners, PipelineEvent};
pub use policy::{is_retryable_method, RetryPolicy};
pub use trace_context::{SpanContext, TRACEPARENT};
