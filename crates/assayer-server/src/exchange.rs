//! Canned responses and recorded requests.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode, Uri};
use http_body_util::Full;

/// A response queued on the mock server.
///
/// ```
/// use assayer_server::MockResponse;
///
/// let response = MockResponse::json(r#"{"greeting":"Hello World"}"#).header("x-id", "7");
/// assert_eq!(response.status(), 200);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct MockResponse {
    status: u16,
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::new(200)
    }
}

impl MockResponse {
    /// An empty response with the given status code.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// A 200 response with a JSON body.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::new(200).content_type("application/json").body(body)
    }

    /// Sets the status code.
    pub fn status_code(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Appends a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// The status code that will be sent.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub(crate) fn not_found() -> Self {
        Self::new(404)
    }

    /// Converts into a hyper response. Invalid status codes and headers are
    /// reported as a 500 carrying the reason in the body.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        match self.try_into_http() {
            Ok(response) => response,
            Err(reason) => {
                tracing::error!(%reason, "invalid mock response");
                let mut response = http::Response::new(Full::new(Bytes::from(reason)));
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }

    fn try_into_http(self) -> Result<http::Response<Full<Bytes>>, String> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|e| format!("invalid status {}: {e}", self.status))?;

        let mut headers = HeaderMap::new();
        if let Some(content_type) = &self.content_type {
            let value = HeaderValue::from_str(content_type)
                .map_err(|e| format!("invalid content type '{content_type}': {e}"))?;
            headers.insert(CONTENT_TYPE, value);
        }
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| format!("invalid header name '{name}': {e}"))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| format!("invalid value for header '{name}': {e}"))?;
            headers.append(header_name, header_value);
        }

        let mut response = http::Response::new(Full::new(self.body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// A request received by the mock server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request method.
    pub method: Method,
    /// Request target (path and query).
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
}

impl RecordedRequest {
    /// The request path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// First value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body as UTF-8, if valid.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_http_sets_headers() {
        let response = MockResponse::json("{}")
            .status_code(201)
            .header("x-a", "1")
            .header("x-a", "2")
            .into_http();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers().get_all("x-a").iter().count(), 2);
    }

    #[test]
    fn test_invalid_status_becomes_server_error() {
        let response = MockResponse::new(1000).into_http();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_header_becomes_server_error() {
        let response = MockResponse::new(200).header("bad header", "x").into_http();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_recorded_request_accessors() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("on"));
        let request = RecordedRequest {
            method: Method::POST,
            uri: Uri::from_static("/users?page=2"),
            headers,
            body: Bytes::from_static(b"name=alice"),
        };

        assert_eq!(request.path(), "/users");
        assert_eq!(request.query(), Some("page=2"));
        assert_eq!(request.header("x-trace"), Some("on"));
        assert_eq!(request.body_str(), Some("name=alice"));
    }
}
