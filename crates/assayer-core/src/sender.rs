//! Transports and the request sender used in `when` closures.

use std::sync::Arc;

use http::Method;

use crate::error::{AssayError, AssayResult};
use crate::filter::FilterContext;
use crate::logging;
use crate::request::{PreparedRequest, RequestSpecification};
use crate::response::Response;

/// Sends prepared requests and produces responses.
///
/// Each backend supplies one implementation: a real HTTP client, an
/// in-process mock application, or an async test client.
pub trait Transport: Send + Sync {
    /// Dispatches `request` exactly once.
    fn dispatch(&self, request: PreparedRequest) -> AssayResult<Response>;
}

/// No transport: every dispatch fails. Useful with filters that answer
/// requests themselves.
impl Transport for () {
    fn dispatch(&self, request: PreparedRequest) -> AssayResult<Response> {
        Err(AssayError::dispatch(format!(
            "no transport configured for {} {}",
            request.method, request.uri
        )))
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn dispatch(&self, request: PreparedRequest) -> AssayResult<Response> {
        (**self).dispatch(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn dispatch(&self, request: PreparedRequest) -> AssayResult<Response> {
        (**self).dispatch(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn dispatch(&self, request: PreparedRequest) -> AssayResult<Response> {
        (**self).dispatch(request)
    }
}

/// Issues HTTP calls for a request specification.
///
/// Every verb method prepares the request, runs the filters and dispatches
/// exactly once through the specification's transport.
pub struct RequestSender<T> {
    spec: RequestSpecification<T>,
}

impl<T: Transport> RequestSender<T> {
    /// Creates a sender for `spec`.
    pub fn new(spec: RequestSpecification<T>) -> Self {
        Self { spec }
    }

    /// The specification requests are built from.
    pub fn specification(&self) -> &RequestSpecification<T> {
        &self.spec
    }

    /// Performs a request with an arbitrary method.
    pub fn request(&self, method: Method, path: &str) -> AssayResult<Response> {
        let request = self.spec.prepare(method, path)?;
        if let Some(detail) = self.spec.log_detail {
            logging::log_request(&request, detail);
        }
        tracing::debug!(method = %request.method, uri = %request.uri, "dispatching request");

        let ctx = FilterContext::new(&self.spec.filters, &self.spec.transport);
        ctx.next(request)
    }

    /// Performs a GET request.
    pub fn get(&self, path: &str) -> AssayResult<Response> {
        self.request(Method::GET, path)
    }

    /// Performs a POST request.
    pub fn post(&self, path: &str) -> AssayResult<Response> {
        self.request(Method::POST, path)
    }

    /// Performs a PUT request.
    pub fn put(&self, path: &str) -> AssayResult<Response> {
        self.request(Method::PUT, path)
    }

    /// Performs a PATCH request.
    pub fn patch(&self, path: &str) -> AssayResult<Response> {
        self.request(Method::PATCH, path)
    }

    /// Performs a DELETE request.
    pub fn delete(&self, path: &str) -> AssayResult<Response> {
        self.request(Method::DELETE, path)
    }

    /// Performs a HEAD request.
    pub fn head(&self, path: &str) -> AssayResult<Response> {
        self.request(Method::HEAD, path)
    }

    /// Performs an OPTIONS request.
    pub fn options(&self, path: &str) -> AssayResult<Response> {
        self.request(Method::OPTIONS, path)
    }
}
