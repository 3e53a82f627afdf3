//! Dispatched responses.

use std::fmt;

use bytes::Bytes;
use cookie::Cookie;
use http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{AssayError, AssayResult};
use crate::json_path::JsonPath;

/// The immutable result of dispatching a request.
#[derive(Clone)]
pub struct Response {
    /// HTTP status code
    status: StatusCode,
    /// Status line, e.g. `HTTP/1.1 200 OK`
    status_line: String,
    /// Response headers
    headers: HeaderMap,
    /// Response body bytes
    body: Bytes,
}

impl Response {
    /// Creates a response from raw parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status_line: default_status_line(status),
            status,
            headers,
            body,
        }
    }

    /// Creates a response from HTTP response parts and a collected body.
    #[must_use]
    pub fn from_parts(parts: http::response::Parts, body: Bytes) -> Self {
        Self::new(parts.status, parts.headers, body).with_version(parts.version)
    }

    /// Rewrites the status line for the given protocol version.
    #[must_use]
    pub fn with_version(mut self, version: http::Version) -> Self {
        self.status_line = format!(
            "{version:?} {} {}",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("")
        )
        .trim_end()
        .to_string();
        self
    }

    /// Replaces the status line.
    #[must_use]
    pub fn with_status_line(mut self, status_line: impl Into<String>) -> Self {
        self.status_line = status_line.into();
        self
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the status line.
    #[must_use]
    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// Returns a reference to the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Gets every value of a repeated header.
    #[must_use]
    pub fn header_values(&self, name: impl AsRef<str>) -> Vec<&str> {
        self.headers
            .get_all(name.as_ref())
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn text(&self) -> AssayResult<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| AssayError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> AssayResult<T> {
        serde_json::from_slice(&self.body).map_err(AssayError::Json)
    }

    /// Parses the body for path evaluation.
    pub fn json_path(&self) -> AssayResult<JsonPath> {
        JsonPath::from_slice(&self.body)
    }

    /// Cookies set by this response through `Set-Cookie` headers.
    ///
    /// Percent-encoded names and values are decoded; unparsable `Set-Cookie`
    /// values are skipped.
    #[must_use]
    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        self.header_values(header::SET_COOKIE.as_str())
            .into_iter()
            .filter_map(|raw| {
                Cookie::parse_encoded(raw.to_string())
                    .or_else(|_| Cookie::parse(raw.to_string()))
                    .ok()
            })
            .collect()
    }

    /// The value of the cookie named `name`, if the response sets it.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies()
            .into_iter()
            .find(|c| c.name() == name)
            .map(|c| c.value().to_string())
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status_line", &self.status_line)
            .field("headers", &self.headers)
            .field("body", &String::from_utf8_lossy(&self.body))
            .finish()
    }
}

fn default_status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP/1.1 {} {reason}", status.as_u16()),
        None => format!("HTTP/1.1 {}", status.as_u16()),
    }
}

/// Builds canned responses, typically returned from a filter.
///
/// # Example
///
/// ```
/// use assayer_core::{ContentType, ResponseBuilder};
///
/// let response = ResponseBuilder::new()
///     .status_code(200)
///     .content_type(ContentType::Json)
///     .body(r#"{"message":"Hello World"}"#)
///     .build()
///     .unwrap();
/// assert_eq!(response.status_line(), "HTTP/1.1 200 OK");
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct ResponseBuilder {
    status: u16,
    status_line: Option<String>,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    /// Starts a `200 OK` response with no headers and an empty body.
    pub fn new() -> Self {
        Self {
            status: 200,
            status_line: None,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Starts from an existing response, keeping its status, headers and body.
    pub fn from_response(response: &Response) -> Self {
        Self {
            status: response.status_code(),
            status_line: None,
            headers: response
                .headers()
                .iter()
                .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
                .collect(),
            body: response.body().clone(),
        }
    }

    /// Sets the status code.
    pub fn status_code(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the status line. Defaults to `HTTP/1.1 <code> <reason>`.
    pub fn status_line(mut self, status_line: impl Into<String>) -> Self {
        self.status_line = Some(status_line.into());
        self
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        let value = content_type.as_ref().to_string();
        self.header(header::CONTENT_TYPE.as_str(), value)
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the response.
    pub fn build(self) -> AssayResult<Response> {
        let status = StatusCode::from_u16(self.status).map_err(|e| {
            AssayError::RequestBuild(format!("invalid status code {}: {e}", self.status))
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::try_from(name.as_str())
                .map_err(|e| AssayError::InvalidHeader(format!("{name}: {e}")))?;
            let header_value = HeaderValue::try_from(value.as_str())
                .map_err(|e| AssayError::InvalidHeader(format!("{name}: {e}")))?;
            headers.append(header_name, header_value);
        }

        let response = Response::new(status, headers, self.body);
        Ok(match self.status_line {
            Some(line) => response.with_status_line(line),
            None => response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn json_response(body: &str) -> Response {
        ResponseBuilder::new()
            .content_type("application/json")
            .body(body.to_string())
            .build()
            .unwrap()
    }

    #[test]
    fn test_status_and_status_line() {
        let response = ResponseBuilder::new().status_code(404).build().unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.status_line(), "HTTP/1.1 404 Not Found");

        let custom = ResponseBuilder::new()
            .status_code(299)
            .build()
            .unwrap();
        assert_eq!(custom.status_line(), "HTTP/1.1 299");
    }

    #[test]
    fn test_from_parts_uses_protocol_version() {
        let (mut parts, ()) = http::Response::new(()).into_parts();
        parts.status = StatusCode::CREATED;
        parts.version = http::Version::HTTP_2;
        let response = Response::from_parts(parts, Bytes::new());
        assert_eq!(response.status_line(), "HTTP/2.0 201 Created");
    }

    #[test]
    fn test_invalid_status_code() {
        let err = ResponseBuilder::new().status_code(42).build().unwrap_err();
        assert!(matches!(err, AssayError::RequestBuild(_)));
    }

    #[test]
    fn test_headers() {
        let response = ResponseBuilder::new()
            .header("X-Custom", "custom-value")
            .header("X-Multi", "a")
            .header("X-Multi", "b")
            .content_type("text/plain")
            .build()
            .unwrap();
        assert_eq!(response.header("x-custom"), Some("custom-value"));
        assert_eq!(response.header_values("X-Multi"), vec!["a", "b"]);
        assert_eq!(response.content_type(), Some("text/plain"));
        assert!(response.header("Missing").is_none());
    }

    #[test]
    fn test_text() {
        let response = ResponseBuilder::new().body("Hello, World!").build().unwrap();
        assert_eq!(response.text().unwrap(), "Hello, World!");

        let invalid = ResponseBuilder::new()
            .body(vec![0xff, 0xfe])
            .build()
            .unwrap();
        assert!(matches!(invalid.text(), Err(AssayError::BodyRead(_))));
    }

    #[test]
    fn test_json() {
        #[derive(Deserialize)]
        struct User {
            id: String,
            name: String,
        }

        let response = json_response(r#"{"id":"123","name":"Alice"}"#);
        let user: User = response.json().unwrap();
        assert_eq!(user.id, "123");
        assert_eq!(user.name, "Alice");
        assert_eq!(
            response.json_path().unwrap().get::<String>("name").unwrap(),
            "Alice"
        );
    }

    #[test]
    fn test_cookies() {
        let response = ResponseBuilder::new()
            .header("Set-Cookie", "session=abc123; Path=/; HttpOnly")
            .header("Set-Cookie", "theme=dark")
            .build()
            .unwrap();
        assert_eq!(response.cookies().len(), 2);
        assert_eq!(response.cookie("session").as_deref(), Some("abc123"));
        assert_eq!(response.cookie("theme").as_deref(), Some("dark"));
        assert_eq!(response.cookie("missing"), None);
    }

    #[test]
    fn test_percent_encoded_cookie_values_are_decoded() {
        let response = ResponseBuilder::new()
            .header("Set-Cookie", "greeting=Hello%20World; Path=/")
            .build()
            .unwrap();
        assert_eq!(response.cookie("greeting").as_deref(), Some("Hello World"));
    }

    #[test]
    fn test_from_response() {
        let original = json_response("{}");
        let copy = ResponseBuilder::from_response(&original)
            .status_code(201)
            .build()
            .unwrap();
        assert_eq!(copy.content_type(), Some("application/json"));
        assert_eq!(copy.body(), original.body());
        assert_eq!(copy.status_line(), "HTTP/1.1 201 Created");
    }
}
