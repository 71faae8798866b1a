//! Per-attempt request logging.
//!
//! The [`AttemptLog`] decorator sits inside the retry loop, so every attempt
//! produces exactly one [`AttemptRecord`], handed to the client's
//! [`RequestLogger`]. The default logger writes a `tracing` event whose level
//! follows the status class.

use arc_swap::ArcSwap;
use futures::future::BoxFuture;
use http::{Method, StatusCode};
use opchain_core::{Call, HttpResponse, TransportError};
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tower::{Layer, Service};
use tracing::Level;

/// What one attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Status(StatusCode),
    /// No response; the transport error's message.
    Error(String),
}

/// One completed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub backend: String,
    pub operation: String,
    pub method: Method,
    pub uri: String,
    pub outcome: AttemptOutcome,
    pub duration: Duration,
}

impl AttemptRecord {
    /// Severity for this attempt: `INFO` below 400, `WARN` for 4xx, `ERROR`
    /// for 5xx and transport errors.
    pub fn level(&self) -> Level {
        match &self.outcome {
            AttemptOutcome::Status(s) if s.is_server_error() => Level::ERROR,
            AttemptOutcome::Status(s) if s.is_client_error() => Level::WARN,
            AttemptOutcome::Status(_) => Level::INFO,
            AttemptOutcome::Error(_) => Level::ERROR,
        }
    }

    /// The status code, if a response arrived.
    pub fn status(&self) -> Option<StatusCode> {
        match self.outcome {
            AttemptOutcome::Status(s) => Some(s),
            AttemptOutcome::Error(_) => None,
        }
    }
}

/// Receives one record per attempt.
pub trait RequestLogger: Send + Sync {
    fn log_attempt(&self, record: &AttemptRecord);
}

impl<F> RequestLogger for F
where
    F: Fn(&AttemptRecord) + Send + Sync,
{
    fn log_attempt(&self, record: &AttemptRecord) {
        self(record)
    }
}

/// Writes attempts as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl RequestLogger for TracingLogger {
    fn log_attempt(&self, r: &AttemptRecord) {
        let duration_ms = r.duration.as_millis() as u64;
        match (&r.outcome, r.level()) {
            (AttemptOutcome::Error(error), _) => tracing::error!(
                backend = %r.backend,
                operation = %r.operation,
                method = %r.method,
                uri = %r.uri,
                error = %error,
                duration_ms,
                "client request failed"
            ),
            (AttemptOutcome::Status(status), Level::ERROR) => tracing::error!(
                backend = %r.backend,
                operation = %r.operation,
                method = %r.method,
                uri = %r.uri,
                status_code = status.as_u16(),
                duration_ms,
                "client request"
            ),
            (AttemptOutcome::Status(status), Level::WARN) => tracing::warn!(
                backend = %r.backend,
                operation = %r.operation,
                method = %r.method,
                uri = %r.uri,
                status_code = status.as_u16(),
                duration_ms,
                "client request"
            ),
            (AttemptOutcome::Status(status), _) => tracing::info!(
                backend = %r.backend,
                operation = %r.operation,
                method = %r.method,
                uri = %r.uri,
                status_code = status.as_u16(),
                duration_ms,
                "client request"
            ),
        }
    }
}

/// A swappable logger shared by a client and its chain.
#[derive(Clone)]
pub struct LoggerHandle {
    slot: Arc<ArcSwap<Arc<dyn RequestLogger>>>,
}

impl LoggerHandle {
    pub fn new(logger: Arc<dyn RequestLogger>) -> Self {
        Self {
            slot: Arc::new(ArcSwap::from_pointee(logger)),
        }
    }

    pub fn get(&self) -> Arc<dyn RequestLogger> {
        Arc::clone(&**self.slot.load())
    }

    pub fn set(&self, logger: Arc<dyn RequestLogger>) {
        self.slot.store(Arc::new(logger));
    }
}

impl Default for LoggerHandle {
    fn default() -> Self {
        Self::new(Arc::new(TracingLogger))
    }
}

impl fmt::Debug for LoggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerHandle").finish_non_exhaustive()
    }
}

/// Layer producing [`AttemptLog`] services.
#[derive(Debug, Clone)]
pub struct AttemptLogLayer {
    backend: Arc<str>,
    logger: LoggerHandle,
}

impl AttemptLogLayer {
    pub fn new(backend: impl Into<Arc<str>>, logger: LoggerHandle) -> Self {
        Self {
            backend: backend.into(),
            logger,
        }
    }
}

impl<S> Layer<S> for AttemptLogLayer {
    type Service = AttemptLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AttemptLog {
            inner,
            backend: Arc::clone(&self.backend),
            logger: self.logger.clone(),
        }
    }
}

/// Logs every attempt that passes through it.
#[derive(Debug, Clone)]
pub struct AttemptLog<S> {
    inner: S,
    backend: Arc<str>,
    logger: LoggerHandle,
}

impl<S> Service<Call> for AttemptLog<S>
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

    fn call(&mut self, call: Call) -> Self::Future {
        let backend = self.backend.to_string();
        let operation = call.context.operation().unwrap_or_default().to_string();
        let method = call.request.method().clone();
        let uri = call.request.uri().to_string();
        let logger = self.logger.get();
        let fut = self.inner.call(call);

        Box::pin(async move {
            let start = Instant::now();
            let result = fut.await;
            let outcome = match &result {
                Ok(response) => AttemptOutcome::Status(response.status()),
                Err(e) => AttemptOutcome::Error(e.to_string()),
            };
            logger.log_attempt(&AttemptRecord {
                backend,
                operation,
                method,
                uri,
                outcome,
                duration: start.elapsed(),
            });
            result
        })
    }
}
