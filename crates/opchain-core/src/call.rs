use crate::context::CallContext;
use bytes::Bytes;
use http::Method;

/// A fully buffered outgoing request.
///
/// Bodies are buffered up front so every retry attempt can replay them.
pub type HttpRequest = http::Request<Bytes>;

/// A fully buffered response. The transport reads the whole body before
/// handing the response back up the chain.
pub type HttpResponse = http::Response<Bytes>;

/// One logical request travelling down the doer chain.
#[derive(Debug)]
pub struct Call {
    /// Per-call configuration (operation name, overrides, deadline, parent span).
    pub context: CallContext,
    /// The request itself.
    pub request: HttpRequest,
}

impl Call {
    /// Creates a new call.
    pub fn new(context: CallContext, request: HttpRequest) -> Self {
        Self { context, request }
    }

    /// Returns the HTTP method of the request.
    pub fn method(&self) -> &Method {
        self.request.method()
    }
}

impl Clone for Call {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            request: clone_request(&self.request),
        }
    }
}

/// Copies a buffered request: method, URI, version, headers and body.
///
/// Request extensions are not copied.
pub fn clone_request(request: &HttpRequest) -> HttpRequest {
    let mut copy = http::Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}
