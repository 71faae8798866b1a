//! The innermost doer: one HTTP exchange over reqwest.

use futures::future::BoxFuture;
use opchain_core::{Call, HttpResponse, TransportError};
use std::task::{Context, Poll};
use tower::Service;

/// Sends one request and reads the whole response body.
///
/// No policy lives here: status codes are never interpreted and nothing is
/// retried. The call's deadline, if any, bounds the exchange and yields
/// [`TransportError::Timeout`].
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Service<Call> for HttpTransport {
    type Response = HttpResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<HttpResponse, TransportError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: Call) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move {
            let deadline = call.context.deadline();
            let request = reqwest::Request::try_from(call.request)
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            let exchange = exchange(client, request);
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, exchange)
                    .await
                    .map_err(|_| TransportError::Timeout)?,
                None => exchange.await,
            }
        })
    }
}

async fn exchange(client: reqwest::Client, request: reqwest::Request) -> Result<HttpResponse, TransportError> {
    let response = client.execute(request).await.map_err(network)?;
    let status = response.status();
    let version = response.version();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(network)?;

    let mut out = http::Response::new(body);
    *out.status_mut() = status;
    *out.version_mut() = version;
    *out.headers_mut() = headers;
    Ok(out)
}

fn network(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}
