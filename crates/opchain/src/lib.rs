//! Typed HTTP client request pipeline.
//!
//! `opchain` turns a typed operation call into an HTTP request, runs it
//! through a chain of decorators and maps the response back to a typed
//! result by status code.
//!
//! # The chain
//!
//! ```text
//! CircuitBreaker → Retry → AttemptLog → Traced → HttpTransport
//! ```
//!
//! - [`HttpTransport`]: one reqwest exchange, bounded by the call's deadline
//! - [`Traced`]: a client span per attempt and a `traceparent` header
//! - [`AttemptLog`](log::AttemptLog): one [`AttemptRecord`] per attempt
//! - [`Retry`](opchain_retry::Retry): replays idempotent calls per the
//!   effective [`RetryPolicy`]
//! - [`CircuitBreaker`](opchain_circuitbreaker::CircuitBreaker): a named
//!   circuit per backend, in debug or enforcing mode
//!
//! # Operations
//!
//! An [`Operation`] describes a call statically. Each call builds an
//! [`OperationRequest`] and hands it to [`Client::execute`] with the
//! operation's [`Responses`] table. Declared success codes become `Ok`,
//! declared error codes become [`CallError::Api`], anything else becomes
//! [`CallError::UnknownResponse`].
//!
//! ```rust,no_run
//! use http::Method;
//! use opchain::{CallContext, CallError, Client, Operation, OperationRequest, Responses};
//! use serde::Deserialize;
//! use std::sync::LazyLock;
//!
//! #[derive(Debug, Deserialize)]
//! struct Book { id: i64, name: String }
//!
//! #[derive(Debug, Deserialize, thiserror::Error)]
//! #[error("book not found")]
//! struct NotFound {}
//!
//! static GET_BOOK: Operation = Operation::new("getBookByID", Method::GET, "/v1/books/{book_id}");
//!
//! static GET_BOOK_RESPONSES: LazyLock<Responses<Book, NotFound>> = LazyLock::new(|| {
//!     Responses::new().ok::<Book>(200, |b| b).err::<NotFound>(404, |e| e)
//! });
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::builder("library").base_url("http://library.internal").build()?;
//!
//! let request = OperationRequest::new(&GET_BOOK).path_param("book_id", 7);
//! match client.execute(CallContext::new(), request, &GET_BOOK_RESPONSES).await {
//!     Ok(book) => println!("{}", book.name),
//!     Err(CallError::Api(not_found)) => println!("{not_found}"),
//!     Err(other) => return Err(other.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub use client::{Client, ClientBuilder, Transport};
pub use dispatch::Responses;
pub use error::{BuildError, CallError, InternalError, UnknownResponse};
pub use log::{AttemptLogLayer, AttemptOutcome, AttemptRecord, LoggerHandle, RequestLogger, TracingLogger};
pub use operation::{CollectionFormat, Operation, OperationRequest, QueryValue};
pub use paging::{PageIter, NEXT_PAGE_HEADER};
pub use trace::{TraceLayer, Traced};
pub use transport::HttpTransport;

pub use opchain_circuitbreaker::{CircuitBreakerSettings, CircuitHandle, CircuitMetrics, CircuitRegistry, CircuitState};
pub use opchain_core::{CallContext, RetryPolicy, SpanContext};
pub use opchain_retry::{
    CountRetryPolicy, CustomRetryPolicy, ExponentialRetryPolicy, NoRetryPolicy, RetryPolicyBuilder, SingleRetryPolicy,
};

mod client;
pub mod discovery;
mod dispatch;
mod error;
pub mod log;
pub mod operation;
mod paging;
mod trace;
mod transport;
