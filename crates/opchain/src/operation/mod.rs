//! Operation descriptors and request building.
//!
//! An [`Operation`] is the static part of an API call: its canonical id,
//! method and path template. An [`OperationRequest`] collects one call's
//! parameters and turns them into an [`HttpRequest`] against a base URL.
//!
//! ```rust
//! use http::Method;
//! use opchain::operation::{Operation, OperationRequest};
//! use url::Url;
//!
//! static GET_BOOK: Operation = Operation::new("getBookByID", Method::GET, "/v1/books/{book_id}");
//!
//! let base = Url::parse("http://library.internal").unwrap();
//! let request = OperationRequest::new(&GET_BOOK)
//!     .path_param("book_id", 42)
//!     .query("authorization", "token")
//!     .build(&base, "1.0.0")
//!     .unwrap();
//!
//! assert_eq!(request.uri(), "http://library.internal/v1/books/42?authorization=token");
//! assert_eq!(request.headers()["canonical-resource"], "getBookByID");
//! ```

mod path;
mod query;

pub use query::{CollectionFormat, QueryPairs, QueryValue};

pub(crate) use path::resolve_link;

use crate::error::BuildError;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::Method;
use opchain_core::HttpRequest;
use serde::Serialize;
use std::fmt;
use url::Url;

/// Header carrying the generated client's version.
pub const CLIENT_VERSION_HEADER: &str = "x-client-version";

/// Header carrying the operation id, for log correlation across services.
pub const CANONICAL_RESOURCE_HEADER: &str = "canonical-resource";

/// Static metadata of one API operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Canonical resource name, also used as the tracing operation name.
    pub id: &'static str,
    pub method: Method,
    /// Path template with `{name}` placeholders.
    pub path: &'static str,
}

impl Operation {
    pub const fn new(id: &'static str, method: Method, path: &'static str) -> Self {
        Self { id, method, path }
    }
}

/// Parameters of one call to an [`Operation`].
///
/// Setters never fail; the first invalid input is remembered and reported by
/// [`build`](Self::build).
pub struct OperationRequest<'a> {
    operation: &'a Operation,
    path_params: Vec<(&'static str, String)>,
    query: QueryPairs,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Option<Bytes>,
    error: Option<BuildError>,
}

impl<'a> OperationRequest<'a> {
    pub fn new(operation: &'a Operation) -> Self {
        Self {
            operation,
            path_params: Vec::new(),
            query: QueryPairs::new(),
            headers: Vec::new(),
            body: None,
            error: None,
        }
    }

    pub fn operation(&self) -> &'a Operation {
        self.operation
    }

    /// Sets a path parameter.
    pub fn path_param(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.path_params.push((name, value.to_string()));
        self
    }

    /// Appends a query parameter.
    pub fn query<V: QueryValue + ?Sized>(mut self, name: &str, value: &V) -> Self {
        self.query.push(name, value);
        self
    }

    /// Appends a query parameter if `value` is present.
    pub fn query_opt<V: QueryValue>(self, name: &str, value: Option<&V>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    /// Appends a list query parameter.
    pub fn query_list<V: QueryValue>(mut self, name: &str, values: &[V], format: CollectionFormat) -> Self {
        self.query.push_list(name, values, format);
        self
    }

    /// Adds an operation-specific header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let parsed = HeaderName::try_from(name)
            .map_err(|e| e.to_string())
            .and_then(|n| HeaderValue::try_from(value).map(|v| (n, v)).map_err(|e| e.to_string()));
        match parsed {
            Ok(header) => self.headers.push(header),
            Err(reason) => self.fail(BuildError::InvalidHeader {
                name: name.to_string(),
                reason,
            }),
        }
        self
    }

    /// Adds a header if `value` is present.
    pub fn header_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.header(name, value),
            None => self,
        }
    }

    /// Sets a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => self.fail(BuildError::Body(e)),
        }
        self
    }

    fn fail(&mut self, error: BuildError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Builds the HTTP request against `base`.
    pub fn build(self, base: &Url, client_version: &str) -> Result<HttpRequest, BuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut url = path::resolve(base, self.operation.path, &self.path_params)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }

        let mut builder = http::Request::builder()
            .method(self.operation.method.clone())
            .uri(url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(CANONICAL_RESOURCE_HEADER, self.operation.id);
        builder = match HeaderValue::try_from(client_version) {
            Ok(version) => builder.header(CLIENT_VERSION_HEADER, version),
            Err(e) => {
                return Err(BuildError::InvalidHeader {
                    name: CLIENT_VERSION_HEADER.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }

        Ok(builder.body(self.body.unwrap_or_default())?)
    }
}

impl fmt::Debug for OperationRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRequest")
            .field("operation", &self.operation.id)
            .field("path_params", &self.path_params)
            .field("query", &self.query)
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .finish()
    }
}
