//! The client: one doer chain per backend, shared by every operation.

use crate::discovery::{self, DiscoveryError};
use crate::dispatch::Responses;
use crate::error::{BuildError, CallError, InternalError};
use crate::log::{AttemptLogLayer, LoggerHandle, RequestLogger, TracingLogger};
use crate::operation::OperationRequest;
use crate::paging::PageIter;
use crate::trace::TraceLayer;
use crate::transport::HttpTransport;
use opchain_circuitbreaker::{
    CircuitBreakerError, CircuitBreakerLayer, CircuitBreakerSettings, CircuitHandle, CircuitRegistry,
    DEFAULT_TELEMETRY_INTERVAL,
};
use opchain_core::{Call, CallContext, HttpRequest, HttpResponse, RetryPolicy, TransportError};
use opchain_retry::{ExponentialRetryPolicy, RetryLayer, RetryPolicyHandle};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tower::util::BoxCloneSyncService;
use tower::{Layer, ServiceExt};
use url::Url;

/// The innermost doer, replaceable for tests and benchmarks.
pub type Transport = BoxCloneSyncService<Call, HttpResponse, TransportError>;

type Chain = BoxCloneSyncService<Call, HttpResponse, CircuitBreakerError<TransportError>>;

/// A client for one backend.
///
/// Every call runs through `circuit breaker → retry → attempt log → tracing
/// → transport`. Cloning is cheap and clones share the chain, the circuit
/// and every runtime setting.
///
/// ```rust,no_run
/// use opchain::{Client, NoRetryPolicy};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), opchain::BuildError> {
/// let client = Client::builder("library")
///     .base_url("http://library.internal:8080")
///     .timeout(Duration::from_secs(2))
///     .build()?;
///
/// client.set_retry_policy(NoRetryPolicy);
/// client.set_circuit_breaker_debug(false);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    service: String,
    base_url: Url,
    client_version: String,
    chain: Chain,
    timeout_nanos: AtomicU64,
    retry: RetryPolicyHandle,
    logger: LoggerHandle,
    breaker: CircuitBreakerLayer,
}

impl Client {
    /// Starts building a client for `service`.
    pub fn builder(service: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(service)
    }

    pub fn service_name(&self) -> &str {
        &self.inner.service
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Replaces the default retry policy. Per-call overrides still win.
    pub fn set_retry_policy<P>(&self, policy: P)
    where
        P: RetryPolicy + 'static,
    {
        self.inner.retry.set(policy);
    }

    /// Returns the default retry policy.
    pub fn retry_policy(&self) -> Arc<dyn RetryPolicy> {
        self.inner.retry.get()
    }

    /// Replaces the attempt logger.
    pub fn set_logger<L>(&self, logger: L)
    where
        L: RequestLogger + 'static,
    {
        self.inner.logger.set(Arc::new(logger));
    }

    /// Sets or clears the default timeout for whole calls.
    ///
    /// `Some(Duration::ZERO)` clears it.
    pub fn set_timeout(&self, timeout: Option<Duration>) {
        self.inner.timeout_nanos.store(timeout_to_nanos(timeout), Ordering::Release);
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.inner.timeout_nanos.load(Ordering::Acquire) {
            0 => None,
            nanos => Some(Duration::from_nanos(nanos)),
        }
    }

    /// Turns circuit breaker debug mode on or off.
    ///
    /// In debug mode the circuit counts outcomes but never rejects a call.
    pub fn set_circuit_breaker_debug(&self, debug: bool) {
        self.inner.breaker.set_debug(debug);
    }

    pub fn is_circuit_breaker_debug(&self) -> bool {
        self.inner.breaker.is_debug()
    }

    /// Replaces the thresholds of this client's circuit, for every client
    /// sharing it.
    pub fn set_circuit_breaker_settings(&self, settings: CircuitBreakerSettings) {
        self.inner.breaker.handle().set_settings(settings);
    }

    /// Returns a handle to this client's circuit.
    pub fn circuit(&self) -> CircuitHandle {
        self.inner.breaker.handle()
    }

    /// Builds `request`, runs it through the chain and dispatches the
    /// response through `responses`.
    pub async fn execute<T, E>(
        &self,
        context: CallContext,
        request: OperationRequest<'_>,
        responses: &Responses<T, E>,
    ) -> Result<T, CallError<E>> {
        let operation = request.operation();
        let request = request.build(&self.inner.base_url, &self.inner.client_version)?;
        self.round_trip(context.or_operation(operation.id), request, |response| {
            responses.dispatch(response.status(), response.body())
        })
        .await
    }

    /// Returns an iterator over every item of a paginated listing.
    ///
    /// The first page comes from `request`; later pages from the
    /// `X-Next-Page-Path` header of each response.
    pub fn paginate<T, E>(
        &self,
        context: CallContext,
        request: OperationRequest<'_>,
        responses: &'static Responses<Vec<T>, E>,
    ) -> PageIter<T, E> {
        let operation = request.operation();
        let context = context.or_operation(operation.id);
        let first = request.build(&self.inner.base_url, &self.inner.client_version);
        PageIter::new(self.clone(), context, first, responses)
    }

    /// Runs one request through the chain and decodes the response, both
    /// inside the call's effective deadline.
    pub(crate) async fn round_trip<R, E>(
        &self,
        context: CallContext,
        request: HttpRequest,
        decode: impl FnOnce(HttpResponse) -> Result<R, CallError<E>>,
    ) -> Result<R, CallError<E>> {
        let deadline = context.effective_deadline(self.timeout(), Instant::now());
        let context = match deadline {
            Some(deadline) => context.with_deadline(deadline),
            None => context,
        };

        let chain = self.inner.chain.clone();
        let exchange = async move {
            let response = chain
                .oneshot(Call::new(context, request))
                .await
                .map_err(|e| CallError::<E>::Internal(InternalError::from(e)))?;
            decode(response)
        };

        match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, exchange).await {
                Ok(result) => result,
                Err(_) => Err(CallError::Internal(InternalError::DeadlineExceeded)),
            },
            None => exchange.await,
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("service", &self.inner.service)
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.timeout())
            .field("retry_policy", &self.inner.retry)
            .field("circuit", &self.inner.breaker.handle())
            .finish()
    }
}

// Zero encodes "no timeout".
fn timeout_to_nanos(timeout: Option<Duration>) -> u64 {
    match timeout {
        Some(t) => u64::try_from(t.as_nanos()).unwrap_or(u64::MAX),
        None => 0,
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    service: String,
    base_url: Option<String>,
    client_version: String,
    timeout: Option<Duration>,
    retry_policy: Arc<dyn RetryPolicy>,
    logger: Arc<dyn RequestLogger>,
    circuit_settings: CircuitBreakerSettings,
    circuit_debug: bool,
    registry: Option<Arc<CircuitRegistry>>,
    telemetry: Option<Duration>,
    http_client: Option<reqwest::Client>,
    transport: Option<Transport>,
}

impl ClientBuilder {
    /// Creates a builder with defaults.
    ///
    /// Defaults:
    /// - client version: this crate's version
    /// - timeout: none
    /// - retry policy: [`ExponentialRetryPolicy`]
    /// - logger: [`TracingLogger`]
    /// - circuit: default settings, debug mode on, global registry,
    ///   telemetry every 10s
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            base_url: None,
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            timeout: None,
            retry_policy: Arc::new(ExponentialRetryPolicy::default()),
            logger: Arc::new(TracingLogger),
            circuit_settings: CircuitBreakerSettings::DEFAULT,
            circuit_debug: true,
            registry: None,
            telemetry: Some(DEFAULT_TELEMETRY_INTERVAL),
            http_client: None,
            transport: None,
        }
    }

    /// Creates a builder whose base URL comes from the environment.
    ///
    /// See [`discovery`](crate::discovery) for the variables read.
    pub fn from_discovery(service: impl Into<String>, iface: &str) -> Result<Self, DiscoveryError> {
        let service = service.into();
        let url = discovery::discover(&service, iface)?;
        Ok(Self::new(service).base_url(url.as_str()))
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the value of the `X-Client-Version` header.
    pub fn client_version(mut self, version: impl Into<String>) -> Self {
        self.client_version = version.into();
        self
    }

    /// Sets the default timeout for whole calls, retries and decode included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_policy<P>(mut self, policy: P) -> Self
    where
        P: RetryPolicy + 'static,
    {
        self.retry_policy = Arc::new(policy);
        self
    }

    pub fn logger<L>(mut self, logger: L) -> Self
    where
        L: RequestLogger + 'static,
    {
        self.logger = Arc::new(logger);
        self
    }

    /// Thresholds used if this client is the first to create its circuit.
    pub fn circuit_breaker_settings(mut self, settings: CircuitBreakerSettings) -> Self {
        self.circuit_settings = settings;
        self
    }

    pub fn circuit_breaker_debug(mut self, debug: bool) -> Self {
        self.circuit_debug = debug;
        self
    }

    /// Registers the circuit in `registry` instead of the global one.
    pub fn circuit_registry(mut self, registry: Arc<CircuitRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Disables the circuit telemetry task.
    pub fn without_telemetry(mut self) -> Self {
        self.telemetry = None;
        self
    }

    /// Uses a preconfigured reqwest client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Replaces the HTTP transport with any doer.
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the chain and registers the circuit.
    pub fn build(self) -> Result<Client, BuildError> {
        let raw = self
            .base_url
            .ok_or_else(|| BuildError::InvalidUrl("no base url configured".to_string()))?;
        let base_url = Url::parse(&raw)?;
        if base_url.cannot_be_a_base() {
            return Err(BuildError::InvalidUrl(format!("{raw} cannot be a base url")));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Transport::new(HttpTransport::new(self.http_client.unwrap_or_default())),
        };

        let retry = RetryPolicyHandle::new(self.retry_policy);
        let logger = LoggerHandle::new(self.logger);

        let mut breaker = CircuitBreakerLayer::builder()
            .for_backend(&self.service, base_url.as_str())
            .settings(self.circuit_settings)
            .debug(self.circuit_debug);
        if let Some(registry) = self.registry {
            breaker = breaker.registry(registry);
        }
        breaker = match self.telemetry {
            Some(interval) => breaker.telemetry_interval(interval),
            None => breaker.without_telemetry(),
        };
        let breaker = breaker.build();

        let retried = RetryLayer::builder()
            .name(self.service.clone())
            .policy_handle(retry.clone())
            .build()
            .layer(AttemptLogLayer::new(self.service.as_str(), logger.clone()).layer(TraceLayer::new().layer(transport)));
        let chain = Chain::new(breaker.layer(retried));

        let circuit = breaker.handle();
        tracing::debug!(
            service = %self.service,
            base_url = %base_url,
            circuit = %circuit.name(),
            "client built"
        );

        Ok(Client {
            inner: Arc::new(Inner {
                service: self.service,
                base_url,
                client_version: self.client_version,
                chain,
                timeout_nanos: AtomicU64::new(timeout_to_nanos(self.timeout)),
                retry,
                logger,
                breaker,
            }),
        })
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("service", &self.service)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry_policy", &self.retry_policy)
            .field("circuit_settings", &self.circuit_settings)
            .field("circuit_debug", &self.circuit_debug)
            .finish_non_exhaustive()
    }
}
