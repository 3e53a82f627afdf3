//! Mock applications: routes and handlers answering requests in-process.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use assayer_core::{AssayError, AssayResult, PreparedRequest, Response, ResponseBuilder};
use bytes::Bytes;
use http::header::{HeaderMap, ALLOW};
use http::{Method, Uri};
use serde::de::DeserializeOwned;

use crate::router::PathPattern;

/// A request as seen by a mock handler.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Request method.
    pub method: Method,
    /// Full request URI.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
    path_params: HashMap<String, String>,
}

impl MockRequest {
    fn new(request: PreparedRequest, path_params: HashMap<String, String>) -> Self {
        Self {
            method: request.method,
            uri: request.uri,
            headers: request.headers,
            body: request.body,
            path_params,
        }
    }

    /// The request path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// A parameter captured by the route pattern.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// First value of a query parameter, decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.uri
            .query()
            .and_then(|query| find_pair(query, name))
    }

    /// First value of a URL-encoded form field in the body, decoded.
    pub fn form_param(&self, name: &str) -> Option<String> {
        self.body_str().and_then(|body| find_pair(body, name))
    }

    /// First value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body as UTF-8, if valid.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Deserializes the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> AssayResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

fn find_pair(encoded: &str, name: &str) -> Option<String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(encoded)
        .ok()?
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

/// Produces a response for a matched request.
pub trait Handler: Send + Sync {
    /// Handles `request`.
    fn handle(&self, request: &MockRequest) -> AssayResult<Response>;
}

impl<F> Handler for F
where
    F: Fn(&MockRequest) -> AssayResult<Response> + Send + Sync,
{
    fn handle(&self, request: &MockRequest) -> AssayResult<Response> {
        self(request)
    }
}

struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn Handler>,
}

/// An in-process application made of routes.
///
/// Requests whose path matches no route get a 404; a path that matches under
/// other methods only gets a 405 with an `Allow` header. `HEAD` falls back
/// to the `GET` route with the body removed.
///
/// ```
/// use assayer_core::{ContentType, ResponseBuilder};
/// use assayer_mock::MockApp;
///
/// let app = MockApp::new().get("/users/{id}", |req| {
///     let id = req.path_param("id").unwrap_or_default();
///     ResponseBuilder::new()
///         .content_type(ContentType::Json)
///         .body(format!(r#"{{"id":"{id}"}}"#))
///         .build()
/// });
/// assert_eq!(app.route_count(), 1);
/// ```
#[derive(Default)]
pub struct MockApp {
    routes: Vec<Route>,
}

impl fmt::Debug for MockApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockApp")
            .field(
                "routes",
                &self
                    .routes
                    .iter()
                    .map(|r| format!("{} {}", r.method, r.pattern.as_str()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl MockApp {
    /// An application without routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route. Routes are tried in registration order.
    #[must_use]
    pub fn route<H>(self, method: Method, pattern: &str, handler: H) -> Self
    where
        H: Fn(&MockRequest) -> AssayResult<Response> + Send + Sync + 'static,
    {
        self.handler(method, pattern, handler)
    }

    /// Adds a route served by a [`Handler`] value.
    #[must_use]
    pub fn handler(mut self, method: Method, pattern: &str, handler: impl Handler + 'static) -> Self {
        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(pattern),
            handler: Arc::new(handler),
        });
        self
    }

    /// Adds a GET route.
    #[must_use]
    pub fn get<H>(self, pattern: &str, handler: H) -> Self
    where
        H: Fn(&MockRequest) -> AssayResult<Response> + Send + Sync + 'static,
    {
        self.route(Method::GET, pattern, handler)
    }

    /// Adds a POST route.
    #[must_use]
    pub fn post<H>(self, pattern: &str, handler: H) -> Self
    where
        H: Fn(&MockRequest) -> AssayResult<Response> + Send + Sync + 'static,
    {
        self.route(Method::POST, pattern, handler)
    }

    /// Adds a PUT route.
    #[must_use]
    pub fn put<H>(self, pattern: &str, handler: H) -> Self
    where
        H: Fn(&MockRequest) -> AssayResult<Response> + Send + Sync + 'static,
    {
        self.route(Method::PUT, pattern, handler)
    }

    /// Adds a PATCH route.
    #[must_use]
    pub fn patch<H>(self, pattern: &str, handler: H) -> Self
    where
        H: Fn(&MockRequest) -> AssayResult<Response> + Send + Sync + 'static,
    {
        self.route(Method::PATCH, pattern, handler)
    }

    /// Adds a DELETE route.
    #[must_use]
    pub fn delete<H>(self, pattern: &str, handler: H) -> Self
    where
        H: Fn(&MockRequest) -> AssayResult<Response> + Send + Sync + 'static,
    {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Number of registered routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Routes `request` to the first matching handler.
    ///
    /// Handler errors are returned unchanged.
    pub fn handle(&self, request: PreparedRequest) -> AssayResult<Response> {
        let path = request.uri.path().to_string();
        let mut allowed: Vec<&Method> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern.match_path(&path) else {
                continue;
            };
            if route.method == request.method {
                tracing::debug!(method = %request.method, route = route.pattern.as_str(), "mock route matched");
                return route.handler.handle(&MockRequest::new(request, params));
            }
            allowed.push(&route.method);
        }

        if request.method == Method::HEAD {
            if let Some(route) = self
                .routes
                .iter()
                .find(|r| r.method == Method::GET && r.pattern.match_path(&path).is_some())
            {
                let params = route.pattern.match_path(&path).unwrap_or_default();
                let response = route.handler.handle(&MockRequest::new(request, params))?;
                return ResponseBuilder::from_response(&response).body(Bytes::new()).build();
            }
        }

        if allowed.is_empty() {
            tracing::debug!(method = %request.method, %path, "no mock route");
            return ResponseBuilder::new().status_code(404).build();
        }

        allowed.dedup();
        let allow = allowed
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        ResponseBuilder::new()
            .status_code(405)
            .header(ALLOW.as_str(), allow)
            .build()
    }
}

/// Error for dispatch without an application.
pub(crate) fn no_application(request: &PreparedRequest) -> AssayError {
    AssayError::dispatch(format!(
        "no mock application configured for {} {}; call assayer_mock::standalone_setup or set one with `app`",
        request.method, request.uri
    ))
}
