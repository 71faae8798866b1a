//! Client for the library service.
//!
//! Every operation is a method on [`LibraryClient`] that builds its request,
//! runs it through the opchain pipeline and dispatches the response through
//! the operation's status table.
//!
//! ```rust,no_run
//! use library_client::{LibraryClient, models::GetBookByIdInput};
//! use opchain::{CallContext, CallError, NoRetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LibraryClient::new("http://library.internal:8080")?;
//!
//! let input = GetBookByIdInput { book_id: 7, ..Default::default() };
//! let ctx = CallContext::new().with_retry_policy(NoRetryPolicy);
//! match client.get_book_by_id(ctx, &input).await {
//!     Ok(book) => println!("{book:?}"),
//!     Err(CallError::Api(err)) => println!("library said no: {err}"),
//!     Err(err) => return Err(err.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod models;

use errors::{
    BadRequest, CreateBookError, DeleteBookError, GetBookByIdError, GetBooksError, HealthCheckError, InternalError,
    NotFound, Unauthorized,
};
use futures::Stream;
use http::Method;
use models::{Book, GetBookByIdInput, GetBooksInput, Health};
use opchain::discovery::DiscoveryError;
use opchain::{
    BuildError, CallContext, CallError, CircuitBreakerSettings, CircuitHandle, Client, ClientBuilder,
    CollectionFormat, Operation, OperationRequest, PageIter, RequestLogger, Responses, RetryPolicy,
};
use std::sync::LazyLock;
use std::time::Duration;

/// Service name used for logs and the circuit name.
pub const SERVICE_NAME: &str = "library";

/// Version sent in `X-Client-Version`.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

static HEALTH_CHECK: Operation = Operation::new("healthCheck", Method::GET, "/v1/health/check");
static CREATE_BOOK: Operation = Operation::new("createBook", Method::POST, "/v1/books");
static GET_BOOK_BY_ID: Operation = Operation::new("getBookByID", Method::GET, "/v1/books/{book_id}");
static GET_BOOKS: Operation = Operation::new("getBooks", Method::GET, "/v1/books");
static DELETE_BOOK: Operation = Operation::new("deleteBook", Method::DELETE, "/v1/books/{book_id}");

static HEALTH_CHECK_RESPONSES: LazyLock<Responses<Health, HealthCheckError>> = LazyLock::new(|| {
    Responses::new()
        .ok::<Health>(200, |h| h)
        .err::<BadRequest>(400, HealthCheckError::BadRequest)
        .err::<InternalError>(500, HealthCheckError::InternalError)
});

static CREATE_BOOK_RESPONSES: LazyLock<Responses<Book, CreateBookError>> = LazyLock::new(|| {
    Responses::new()
        .ok::<Book>(200, |b| b)
        .err::<BadRequest>(400, CreateBookError::BadRequest)
        .err::<InternalError>(500, CreateBookError::InternalError)
});

static GET_BOOK_BY_ID_RESPONSES: LazyLock<Responses<Book, GetBookByIdError>> = LazyLock::new(|| {
    Responses::new()
        .ok::<Book>(200, |b| b)
        .err::<BadRequest>(400, GetBookByIdError::BadRequest)
        .err::<Unauthorized>(401, GetBookByIdError::Unauthorized)
        .err::<NotFound>(404, GetBookByIdError::NotFound)
        .err::<InternalError>(500, GetBookByIdError::InternalError)
});

static GET_BOOKS_RESPONSES: LazyLock<Responses<Vec<Book>, GetBooksError>> = LazyLock::new(|| {
    Responses::new()
        .ok::<Vec<Book>>(200, |books| books)
        .err::<BadRequest>(400, GetBooksError::BadRequest)
        .err::<InternalError>(500, GetBooksError::InternalError)
});

static DELETE_BOOK_RESPONSES: LazyLock<Responses<(), DeleteBookError>> = LazyLock::new(|| {
    Responses::new()
        .empty(200, || ())
        .err::<NotFound>(404, DeleteBookError::NotFound)
        .err::<InternalError>(500, DeleteBookError::InternalError)
});

/// Client of the library service.
#[derive(Debug, Clone)]
pub struct LibraryClient {
    client: Client,
}

impl LibraryClient {
    /// Creates a client with default settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BuildError> {
        Self::builder().base_url(base_url).build().map(Self::from_client)
    }

    /// Returns a builder preset with this service's name and version.
    pub fn builder() -> ClientBuilder {
        Client::builder(SERVICE_NAME).client_version(CLIENT_VERSION)
    }

    /// Returns a preset builder whose base URL comes from the
    /// `SERVICE_LIBRARY_<IFACE>_*` environment variables.
    pub fn discover(iface: &str) -> Result<ClientBuilder, DiscoveryError> {
        Ok(ClientBuilder::from_discovery(SERVICE_NAME, iface)?.client_version(CLIENT_VERSION))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// The underlying pipeline client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn set_retry_policy<P: RetryPolicy + 'static>(&self, policy: P) {
        self.client.set_retry_policy(policy);
    }

    pub fn set_logger<L: RequestLogger + 'static>(&self, logger: L) {
        self.client.set_logger(logger);
    }

    pub fn set_timeout(&self, timeout: Option<Duration>) {
        self.client.set_timeout(timeout);
    }

    pub fn set_circuit_breaker_debug(&self, debug: bool) {
        self.client.set_circuit_breaker_debug(debug);
    }

    pub fn set_circuit_breaker_settings(&self, settings: CircuitBreakerSettings) {
        self.client.set_circuit_breaker_settings(settings);
    }

    pub fn circuit(&self) -> CircuitHandle {
        self.client.circuit()
    }

    /// `GET /v1/health/check`
    pub async fn health_check(&self, ctx: CallContext) -> Result<Health, CallError<HealthCheckError>> {
        self.client
            .execute(ctx, OperationRequest::new(&HEALTH_CHECK), &HEALTH_CHECK_RESPONSES)
            .await
    }

    /// `POST /v1/books`. Never retried.
    pub async fn create_book(&self, ctx: CallContext, book: &Book) -> Result<Book, CallError<CreateBookError>> {
        let request = OperationRequest::new(&CREATE_BOOK).json(book);
        self.client.execute(ctx, request, &CREATE_BOOK_RESPONSES).await
    }

    /// `GET /v1/books/{book_id}`
    pub async fn get_book_by_id(
        &self,
        ctx: CallContext,
        input: &GetBookByIdInput,
    ) -> Result<Book, CallError<GetBookByIdError>> {
        let request = OperationRequest::new(&GET_BOOK_BY_ID)
            .path_param("book_id", input.book_id)
            .header_opt("authorization", input.authorization.as_deref());
        self.client.execute(ctx, request, &GET_BOOK_BY_ID_RESPONSES).await
    }

    /// `GET /v1/books`, first page only.
    pub async fn get_books(
        &self,
        ctx: CallContext,
        input: &GetBooksInput,
    ) -> Result<Vec<Book>, CallError<GetBooksError>> {
        self.client
            .execute(ctx, get_books_request(input), &GET_BOOKS_RESPONSES)
            .await
    }

    /// `GET /v1/books`, every page.
    pub fn get_books_iter(&self, ctx: CallContext, input: &GetBooksInput) -> PageIter<Book, GetBooksError> {
        self.client
            .paginate(ctx, get_books_request(input), &GET_BOOKS_RESPONSES)
    }

    /// `GET /v1/books`, every page, as a stream.
    pub fn get_books_stream(
        &self,
        ctx: CallContext,
        input: &GetBooksInput,
    ) -> impl Stream<Item = Result<Book, CallError<GetBooksError>>> {
        self.get_books_iter(ctx, input).into_stream()
    }

    /// `DELETE /v1/books/{book_id}`
    pub async fn delete_book(&self, ctx: CallContext, book_id: i64) -> Result<(), CallError<DeleteBookError>> {
        let request = OperationRequest::new(&DELETE_BOOK).path_param("book_id", book_id);
        self.client.execute(ctx, request, &DELETE_BOOK_RESPONSES).await
    }
}

fn get_books_request(input: &GetBooksInput) -> OperationRequest<'static> {
    OperationRequest::new(&GET_BOOKS)
        .query_list("authors", &input.authors, CollectionFormat::Csv)
        .query_opt("available", input.available.as_ref())
        .query_opt("min_pages", input.min_pages.as_ref())
        .query_opt("max_rating", input.max_rating.as_ref())
        .query_opt("limit", input.limit.as_ref())
        .query_opt("starting_after", input.starting_after.as_ref())
        .header_opt("authorization", input.authorization.as_deref())
}
