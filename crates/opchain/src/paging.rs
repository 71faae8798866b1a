//! Iteration over paginated listings.

use crate::client::Client;
use crate::dispatch::Responses;
use crate::error::{BuildError, CallError};
use crate::operation::resolve_link;
use bytes::Bytes;
use futures::stream::{self, Stream};
use http::{HeaderMap, Method};
use opchain_core::{CallContext, HttpRequest};
use std::collections::VecDeque;
use std::fmt;

/// Response header naming the path of the next page.
pub const NEXT_PAGE_HEADER: &str = "x-next-page-path";

enum Next {
    Request(HttpRequest),
    Path(String),
    Failed(BuildError),
    Done,
}

/// Yields the items of a listing across pages.
///
/// Pages are fetched lazily, one at a time, each as its own call through the
/// client's chain. Iteration ends after the last page or after the first
/// error.
pub struct PageIter<T: 'static, E: 'static> {
    client: Client,
    context: CallContext,
    responses: &'static Responses<Vec<T>, E>,
    method: Method,
    headers: HeaderMap,
    buffer: VecDeque<T>,
    next: Next,
}

impl<T: 'static, E: 'static> PageIter<T, E> {
    pub(crate) fn new(
        client: Client,
        context: CallContext,
        first: Result<HttpRequest, BuildError>,
        responses: &'static Responses<Vec<T>, E>,
    ) -> Self {
        let (method, headers, next) = match first {
            Ok(request) => (request.method().clone(), request.headers().clone(), Next::Request(request)),
            Err(e) => (Method::GET, HeaderMap::new(), Next::Failed(e)),
        };
        Self {
            client,
            context,
            responses,
            method,
            headers,
            buffer: VecDeque::new(),
            next,
        }
    }

    /// Returns the next item, fetching the next page when needed.
    ///
    /// `Ok(None)` means the listing is exhausted.
    pub async fn next(&mut self) -> Result<Option<T>, CallError<E>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }

            let request = match std::mem::replace(&mut self.next, Next::Done) {
                Next::Done => return Ok(None),
                Next::Failed(e) => return Err(CallError::Invalid(e)),
                Next::Request(request) => request,
                Next::Path(path) => self.page_request(&path)?,
            };

            let responses = self.responses;
            let (items, next) = self
                .client
                .round_trip(self.context.clone(), request, |response| {
                    let next = response
                        .headers()
                        .get(NEXT_PAGE_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .filter(|v| !v.is_empty())
                        .map(str::to_owned);
                    let items = responses.dispatch(response.status(), response.body())?;
                    Ok((items, next))
                })
                .await?;

            tracing::trace!(items = items.len(), next = ?next, "fetched page");
            self.buffer.extend(items);
            if let Some(path) = next {
                self.next = Next::Path(path);
            }
        }
    }

    fn page_request(&self, path: &str) -> Result<HttpRequest, BuildError> {
        let url = resolve_link(self.client.base_url(), path)?;
        let mut request = http::Request::builder()
            .method(self.method.clone())
            .uri(url.as_str())
            .body(Bytes::new())?;
        *request.headers_mut() = self.headers.clone();
        Ok(request)
    }

    /// Adapts the iterator into a stream of items.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, CallError<E>>> {
        stream::try_unfold(self, |mut pages| async move {
            Ok::<_, CallError<E>>(pages.next().await?.map(|item| (item, pages)))
        })
    }
}

impl<T: 'static, E: 'static> fmt::Debug for PageIter<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let next = match &self.next {
            Next::Request(_) => "first page",
            Next::Path(path) => path.as_str(),
            Next::Failed(_) => "failed",
            Next::Done => "done",
        };
        f.debug_struct("PageIter")
            .field("operation", &self.context.operation())
            .field("buffered", &self.buffer.len())
            .field("next", &next)
            .finish()
    }
}
