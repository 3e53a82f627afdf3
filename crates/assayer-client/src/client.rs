//! Async test client wrapping an in-memory handler.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use assayer_core::{AssayError, AssayResult, Response};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::{BodyExt, Full};

/// Response type produced by client handlers.
pub type HandlerResponse = http::Response<Full<Bytes>>;

/// Boxed async handler.
pub type ClientHandler = Arc<
    dyn Fn(http::Request<Bytes>) -> Pin<Box<dyn Future<Output = HandlerResponse> + Send>>
        + Send
        + Sync,
>;

/// An async client bound to an in-memory handler.
///
/// Requests never touch the network: [`exchange`](Self::exchange) calls the
/// handler directly and collects its response body.
#[derive(Clone)]
#[must_use]
pub struct WebTestClient {
    handler: ClientHandler,
    default_headers: Vec<(String, String)>,
}

impl fmt::Debug for WebTestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebTestClient")
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

impl WebTestClient {
    /// Creates a client for an async handler.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(http::Request<Bytes>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResponse> + Send + 'static,
    {
        let handler: ClientHandler = Arc::new(
            move |req| -> Pin<Box<dyn Future<Output = HandlerResponse> + Send>> {
                Box::pin(handler(req))
            },
        );
        Self {
            handler,
            default_headers: Vec::new(),
        }
    }

    /// A client answering every request with a JSON echo of its method,
    /// path and body.
    pub fn echo() -> Self {
        Self::new(|req: http::Request<Bytes>| async move {
            let body = serde_json::json!({
                "method": req.method().as_str(),
                "path": req.uri().path(),
                "body": String::from_utf8_lossy(req.body()),
            })
            .to_string();
            let mut response = http::Response::new(Full::new(Bytes::from(body)));
            response.headers_mut().insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        })
    }

    /// A client answering every request with `status` and `body`.
    pub fn fixed_response(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self::new(move |_req| {
            let body = body.clone();
            async move {
                let mut response = http::Response::new(Full::new(body));
                *response.status_mut() = status;
                response
            }
        })
    }

    /// Adds a header sent with every request that does not set it itself.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Sends `request` to the handler and collects the response.
    pub async fn exchange(&self, mut request: http::Request<Bytes>) -> AssayResult<Response> {
        for (name, value) in &self.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AssayError::InvalidHeader(format!("{name}: {e}")))?;
            if !request.headers().contains_key(&name) {
                let value = HeaderValue::from_str(value)
                    .map_err(|e| AssayError::InvalidHeader(format!("{name}: {e}")))?;
                request.headers_mut().insert(name, value);
            }
        }

        let handler = Arc::clone(&self.handler);
        let response = (handler)(request).await;
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .unwrap_or_else(|never| match never {})
            .to_bytes();

        tracing::debug!(status = parts.status.as_u16(), bytes = body.len(), "client handler responded");
        Ok(Response::from_parts(parts, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> http::Request<Bytes> {
        http::Request::builder()
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_echo_client() {
        let client = WebTestClient::echo();
        let response = client.exchange(get("/test/path")).await.unwrap();

        assert_eq!(response.status_code(), 200);
        let json: serde_json::Value = response.json().unwrap();
        assert_eq!(json["method"], "GET");
        assert_eq!(json["path"], "/test/path");
    }

    #[tokio::test]
    async fn test_fixed_response() {
        let client = WebTestClient::fixed_response(StatusCode::CREATED, "created");
        let response = client.exchange(get("/items")).await.unwrap();

        assert_eq!(response.status_code(), 201);
        assert_eq!(response.status_line(), "HTTP/1.1 201 Created");
        assert_eq!(response.text().unwrap(), "created");
    }

    #[tokio::test]
    async fn test_default_headers_do_not_override() {
        let client = WebTestClient::new(|req: http::Request<Bytes>| async move {
            let seen = req
                .headers()
                .get_all("x-client")
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(",");
            http::Response::new(Full::new(Bytes::from(seen)))
        })
        .with_default_header("x-client", "default");

        let response = client.exchange(get("/")).await.unwrap();
        assert_eq!(response.text().unwrap(), "default");

        let mut request = get("/");
        request
            .headers_mut()
            .insert("x-client", HeaderValue::from_static("explicit"));
        let response = client.exchange(request).await.unwrap();
        assert_eq!(response.text().unwrap(), "explicit");
    }

    #[tokio::test]
    async fn test_invalid_default_header() {
        let client = WebTestClient::echo().with_default_header("bad header", "x");
        let err = client.exchange(get("/")).await.unwrap_err();
        assert!(matches!(err, assayer_core::AssayError::InvalidHeader(_)));
    }
}
