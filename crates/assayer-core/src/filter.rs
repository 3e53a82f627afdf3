//! Request filters.
//!
//! Filters wrap dispatch. Each one receives the prepared request and a
//! [`FilterContext`]; calling [`FilterContext::next`] hands the request to
//! the next filter, and finally to the transport. A filter may instead return
//! its own [`Response`] without dispatching at all.
//!
//! ```
//! use assayer_core::{FilterContext, PreparedRequest, Response, AssayResult};
//!
//! fn add_trace_header(
//!     mut request: PreparedRequest,
//!     ctx: &FilterContext<'_>,
//! ) -> AssayResult<Response> {
//!     request
//!         .headers
//!         .insert("x-trace", http::HeaderValue::from_static("on"));
//!     ctx.next(request)
//! }
//! # let _ = add_trace_header;
//! ```

use std::sync::Arc;

use crate::error::AssayResult;
use crate::request::PreparedRequest;
use crate::response::Response;
use crate::sender::Transport;

/// A step run around request dispatch.
pub trait Filter: Send + Sync {
    /// Handles `request`, usually by calling `ctx.next(request)`.
    fn filter(&self, request: PreparedRequest, ctx: &FilterContext<'_>) -> AssayResult<Response>;
}

impl<F> Filter for F
where
    F: Fn(PreparedRequest, &FilterContext<'_>) -> AssayResult<Response> + Send + Sync,
{
    fn filter(&self, request: PreparedRequest, ctx: &FilterContext<'_>) -> AssayResult<Response> {
        self(request, ctx)
    }
}

/// The remaining filters and the transport for one dispatch.
pub struct FilterContext<'a> {
    filters: &'a [Arc<dyn Filter>],
    transport: &'a dyn Transport,
}

impl<'a> FilterContext<'a> {
    pub(crate) fn new(filters: &'a [Arc<dyn Filter>], transport: &'a dyn Transport) -> Self {
        Self { filters, transport }
    }

    /// Passes `request` to the next filter, or to the transport when no
    /// filters remain.
    pub fn next(&self, request: PreparedRequest) -> AssayResult<Response> {
        match self.filters.split_first() {
            Some((filter, rest)) => {
                let ctx = FilterContext::new(rest, self.transport);
                filter.filter(request, &ctx)
            }
            None => self.transport.dispatch(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::Method;

    use crate::config::AssayConfig;
    use crate::request::RequestSpecification;
    use crate::response::ResponseBuilder;

    struct Counting(AtomicUsize);

    impl Transport for Counting {
        fn dispatch(&self, _request: PreparedRequest) -> AssayResult<Response> {
            self.0.fetch_add(1, Ordering::SeqCst);
            ResponseBuilder::new().status_code(204).build()
        }
    }

    fn boxed<F>(f: F) -> Arc<dyn Filter>
    where
        F: Fn(PreparedRequest, &FilterContext<'_>) -> AssayResult<Response> + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    fn prepared(path: &str) -> PreparedRequest {
        RequestSpecification::with_config((), &AssayConfig::default())
            .prepare(Method::GET, path)
            .unwrap()
    }

    #[test]
    fn test_without_filters_dispatches_once() {
        let transport = Counting(AtomicUsize::new(0));
        let ctx = FilterContext::new(&[], &transport);
        let response = ctx.next(prepared("/")).unwrap();
        assert_eq!(response.status_code(), 204);
        assert_eq!(transport.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_filters_run_in_order() {
        let transport = Counting(AtomicUsize::new(0));
        let filters = vec![
            boxed(|mut req, ctx| {
                req.headers.insert("x-order", http::HeaderValue::from_static("first"));
                ctx.next(req)
            }),
            boxed(|req, ctx| {
                assert_eq!(req.header("x-order"), Some("first"));
                ctx.next(req)
            }),
        ];
        let ctx = FilterContext::new(&filters, &transport);
        ctx.next(prepared("/")).unwrap();
        assert_eq!(transport.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_filter_can_short_circuit() {
        let transport = Counting(AtomicUsize::new(0));
        let filters = vec![boxed(|_req, _ctx| ResponseBuilder::new().status_code(418).build())];
        let ctx = FilterContext::new(&filters, &transport);
        let response = ctx.next(prepared("/")).unwrap();
        assert_eq!(response.status_code(), 418);
        assert_eq!(transport.0.load(Ordering::SeqCst), 0);
    }
}
