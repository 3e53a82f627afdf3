//! Request specification and prepared requests.

use std::sync::Arc;

use base64::Engine as _;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::Serialize;

use crate::config::{self, AssayConfig};
use crate::content_type::ContentType;
use crate::error::{AssayError, AssayResult};
use crate::filter::{FilterContext, Filter};
use crate::logging::LogDetail;
use crate::response::Response;

/// A fully resolved request handed to filters and then to a
/// [`Transport`](crate::Transport).
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute request URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

impl PreparedRequest {
    /// The request path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The raw query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// The body as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Converts this request to an HTTP request.
    pub fn into_http_request(self) -> http::Request<Bytes> {
        let mut request = http::Request::new(self.body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

/// Describes the request a chain will dispatch.
///
/// A specification starts from the calling thread's
/// [`AssayConfig`](crate::config::AssayConfig) (base URI, port, base path,
/// default headers, global filters) and is refined with builder methods that
/// take and return `self`, so it fits the `given(|spec| spec.port(7000))`
/// closure style. Nothing is validated until the request is prepared for
/// dispatch; invalid headers or unresolved path parameters surface then as an
/// [`AssayError`].
///
/// `T` is the transport the request will be sent through.
#[must_use]
#[derive(Clone)]
pub struct RequestSpecification<T> {
    pub(crate) transport: T,
    base_uri: String,
    port: u16,
    base_path: String,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    query_params: Vec<(String, String)>,
    form_params: Vec<(String, String)>,
    path_params: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    body: Option<Bytes>,
    content_type: Option<String>,
    pub(crate) filters: Vec<Arc<dyn Filter>>,
    pub(crate) log_detail: Option<LogDetail>,
    url_encoding_enabled: bool,
    build_error: Option<String>,
}

impl<T> RequestSpecification<T> {
    /// Creates a specification for `transport` from the thread's current configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, &config::current())
    }

    /// Creates a specification for `transport` from an explicit configuration.
    pub fn with_config(transport: T, config: &AssayConfig) -> Self {
        Self {
            transport,
            base_uri: config.base_uri.clone(),
            port: config.port,
            base_path: config.base_path.clone(),
            headers: config
                .default_headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            params: Vec::new(),
            query_params: Vec::new(),
            form_params: Vec::new(),
            path_params: Vec::new(),
            cookies: Vec::new(),
            body: None,
            content_type: None,
            filters: config.filters.clone(),
            log_detail: None,
            url_encoding_enabled: config.url_encoding_enabled,
            build_error: None,
        }
    }

    /// The transport requests are sent through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport, for backend-specific configuration.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Sets the base URI, e.g. `http://localhost`.
    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    /// Sets the port used when the base URI does not carry one.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets a path prefix placed before every request path.
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Adds a header. Repeated names are sent as repeated headers.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds several headers.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.content_type = Some(content_type.as_ref().to_string());
        self
    }

    /// Sets the Accept header.
    pub fn accept(self, accept: impl AsRef<str>) -> Self {
        let accept = accept.as_ref().to_string();
        self.header(header::ACCEPT.as_str(), accept)
    }

    /// Adds a cookie sent in the `Cookie` header.
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Adds a parameter: sent in the query string for GET, HEAD, DELETE and
    /// OPTIONS, and as a form parameter for POST, PUT and PATCH.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    /// Adds a query parameter regardless of the method.
    pub fn query_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query_params.push((name.into(), value.to_string()));
        self
    }

    /// Adds a form parameter regardless of the method.
    pub fn form_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.form_params.push((name.into(), value.to_string()));
        self
    }

    /// Sets a value substituted for `{name}` in the request path.
    pub fn path_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path_params.push((name.into(), value.to_string()));
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the request body as JSON.
    ///
    /// This also sets the `Content-Type` header to `application/json` unless
    /// one was already chosen. A serialization failure is reported when the
    /// request is dispatched.
    pub fn json<B: Serialize + ?Sized>(mut self, value: &B) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.body = Some(Bytes::from(bytes));
                if self.content_type.is_none() {
                    self.content_type = Some(ContentType::Json.as_str().to_string());
                }
            }
            Err(e) => self.build_error = Some(format!("JSON body serialization failed: {e}")),
        }
        self
    }

    /// Sets the Authorization header for HTTP basic authentication.
    pub fn auth_basic(self, user: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", user.as_ref(), password.as_ref()));
        self.header(header::AUTHORIZATION.as_str(), format!("Basic {credentials}"))
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn auth_bearer(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header(header::AUTHORIZATION.as_str(), value)
    }

    /// Adds a filter closure run around dispatch, after any global filters.
    pub fn filter<F>(self, filter: F) -> Self
    where
        F: Fn(PreparedRequest, &FilterContext<'_>) -> AssayResult<Response> + Send + Sync + 'static,
    {
        self.add_filter(filter)
    }

    /// Adds a [`Filter`] implementation run around dispatch.
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Logs the prepared request at dispatch time with the given detail.
    pub fn log(mut self, detail: LogDetail) -> Self {
        self.log_detail = Some(detail);
        self
    }

    /// Enables or disables percent-encoding of parameters.
    pub fn url_encoding_enabled(mut self, enabled: bool) -> Self {
        self.url_encoding_enabled = enabled;
        self
    }

    /// Resolves this specification into a request for `method` and `path`.
    ///
    /// `path` may be absolute (`http://...`) or relative to the base URI,
    /// port and base path.
    pub fn prepare(&self, method: Method, path: &str) -> AssayResult<PreparedRequest> {
        if let Some(reason) = &self.build_error {
            return Err(AssayError::RequestBuild(reason.clone()));
        }

        let path = self.resolve_path_params(path)?;
        let body_method = matches!(method, Method::POST | Method::PUT | Method::PATCH);

        let mut query = self.query_params.clone();
        let mut form = self.form_params.clone();
        if body_method {
            form.extend(self.params.iter().cloned());
        } else {
            query.extend(self.params.iter().cloned());
        }

        let mut url = self.target_url(&path);
        if !query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&self.encode_pairs(&query)?);
        }
        let uri: Uri = url
            .parse()
            .map_err(|e| AssayError::RequestBuild(format!("Invalid URI '{url}': {e}")))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let (name, value) = header_pair(name, value)?;
            headers.append(name, value);
        }

        let form_body = self.body.is_none() && !form.is_empty();
        let content_type = self
            .content_type
            .clone()
            .or_else(|| form_body.then(|| ContentType::UrlEnc.as_str().to_string()));
        if let Some(content_type) = content_type {
            let (name, value) = header_pair(header::CONTENT_TYPE.as_str(), &content_type)?;
            headers.insert(name, value);
        }

        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            let (name, value) = header_pair(header::COOKIE.as_str(), &cookie)?;
            headers.insert(name, value);
        }

        let body = match &self.body {
            Some(body) => body.clone(),
            None if form_body => Bytes::from(self.encode_pairs(&form)?),
            None => Bytes::new(),
        };

        Ok(PreparedRequest {
            method,
            uri,
            headers,
            body,
        })
    }

    fn encode(&self, value: &str) -> String {
        if self.url_encoding_enabled {
            urlencoding::encode(value).into_owned()
        } else {
            value.to_string()
        }
    }

    fn encode_pairs(&self, pairs: &[(String, String)]) -> AssayResult<String> {
        if self.url_encoding_enabled {
            return serde_urlencoded::to_string(pairs)
                .map_err(|e| AssayError::RequestBuild(format!("Invalid parameters: {e}")));
        }
        Ok(pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&"))
    }

    fn resolve_path_params(&self, path: &str) -> AssayResult<String> {
        let mut resolved = String::with_capacity(path.len());
        let mut rest = path;

        while let Some(open) = rest.find('{') {
            resolved.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                AssayError::RequestBuild(format!("Unclosed path parameter in '{path}'"))
            })?;
            let name = &after[..close];
            let value = self
                .path_params
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v)
                .ok_or_else(|| {
                    AssayError::RequestBuild(format!(
                        "Unresolved path parameter '{name}' in '{path}'"
                    ))
                })?;
            resolved.push_str(&self.encode(value));
            rest = &after[close + 1..];
        }

        resolved.push_str(rest);
        Ok(resolved)
    }

    fn target_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        let base = self.base_uri.trim_end_matches('/');
        let (scheme, remainder) = base.split_once("://").unwrap_or(("http", base));
        let (authority, base_uri_path) = match remainder.find('/') {
            Some(pos) => (&remainder[..pos], &remainder[pos..]),
            None => (remainder, ""),
        };
        let authority = if authority.contains(':') {
            authority.to_string()
        } else {
            format!("{authority}:{}", self.port)
        };

        format!(
            "{scheme}://{authority}{}",
            join_url_paths(&[base_uri_path, &self.base_path, path])
        )
    }
}

fn header_pair(name: &str, value: &str) -> AssayResult<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::try_from(name)
        .map_err(|e| AssayError::InvalidHeader(format!("{name}: {e}")))?;
    let header_value = HeaderValue::try_from(value)
        .map_err(|e| AssayError::InvalidHeader(format!("{name}: {e}")))?;
    Ok((header_name, header_value))
}

fn join_url_paths(parts: &[&str]) -> String {
    let mut joined = String::new();
    for part in parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
    {
        joined.push('/');
        joined.push_str(part);
    }
    if joined.is_empty() {
        joined.push('/');
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> RequestSpecification<()> {
        RequestSpecification::with_config((), &AssayConfig::default())
    }

    #[test]
    fn test_default_target() {
        let request = spec().prepare(Method::GET, "/users").unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.uri.to_string(), "http://localhost:8080/users");
    }

    #[test]
    fn test_port_base_uri_and_base_path() {
        let request = spec()
            .base_uri("http://example.com/api/")
            .port(7000)
            .base_path("/v1")
            .prepare(Method::PUT, "the/path")
            .unwrap();
        assert_eq!(request.uri.to_string(), "http://example.com:7000/api/v1/the/path");
    }

    #[test]
    fn test_base_uri_with_explicit_port_wins() {
        let request = spec()
            .base_uri("http://127.0.0.1:9999")
            .port(7000)
            .prepare(Method::GET, "/x")
            .unwrap();
        assert_eq!(request.uri.to_string(), "http://127.0.0.1:9999/x");
    }

    #[test]
    fn test_absolute_path_is_used_as_is() {
        let request = spec()
            .prepare(Method::GET, "https://other.host/greeting")
            .unwrap();
        assert_eq!(request.uri.to_string(), "https://other.host/greeting");
    }

    #[test]
    fn test_params_go_to_query_for_get() {
        let request = spec()
            .param("name", "John Doe")
            .query_param("page", 2)
            .prepare(Method::GET, "/greeting")
            .unwrap();
        assert_eq!(request.query(), Some("page=2&name=John+Doe"));
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_params_go_to_form_for_post() {
        let request = spec()
            .param("name", "John")
            .prepare(Method::POST, "/greeting")
            .unwrap();
        assert_eq!(request.query(), None);
        assert_eq!(request.body_str(), Some("name=John"));
        assert_eq!(
            request.header("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn test_path_params() {
        let request = spec()
            .path_param("id", 123)
            .path_param("name", "a b")
            .prepare(Method::GET, "/users/{id}/{name}")
            .unwrap();
        assert_eq!(request.path(), "/users/123/a%20b");

        let err = spec().prepare(Method::GET, "/users/{id}").unwrap_err();
        assert!(matches!(err, AssayError::RequestBuild(ref msg) if msg.contains("'id'")));
    }

    #[test]
    fn test_url_encoding_disabled() {
        let request = spec()
            .url_encoding_enabled(false)
            .query_param("q", "a%20b")
            .prepare(Method::GET, "/search")
            .unwrap();
        assert_eq!(request.query(), Some("q=a%20b"));
    }

    #[test]
    fn test_headers_and_cookies() {
        let request = spec()
            .header("Header", "Header")
            .header("X-Multi", "one")
            .header("X-Multi", "two")
            .accept(ContentType::Json)
            .cookie("session", "abc")
            .cookie("theme", "dark")
            .prepare(Method::GET, "/")
            .unwrap();
        assert_eq!(request.header("Header"), Some("Header"));
        assert_eq!(request.headers.get_all("X-Multi").iter().count(), 2);
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.header("Cookie"), Some("session=abc; theme=dark"));
    }

    #[test]
    fn test_invalid_header_surfaces_at_prepare() {
        let err = spec()
            .header("bad header", "value")
            .prepare(Method::GET, "/")
            .unwrap_err();
        assert!(matches!(err, AssayError::InvalidHeader(_)));
    }

    #[test]
    fn test_json_body() {
        let request = spec()
            .json(&json!({"name": "Alice"}))
            .prepare(Method::POST, "/users")
            .unwrap();
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.body.as_ref(), b"{\"name\":\"Alice\"}");
    }

    #[test]
    fn test_raw_body_with_content_type() {
        let request = spec()
            .body("hello")
            .content_type(ContentType::Text)
            .prepare(Method::PUT, "/the/path")
            .unwrap();
        assert_eq!(request.body_str(), Some("hello"));
        assert_eq!(request.header("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn test_auth_headers() {
        let basic = spec().auth_basic("user", "pass").prepare(Method::GET, "/").unwrap();
        assert_eq!(basic.header("Authorization"), Some("Basic dXNlcjpwYXNz"));

        let bearer = spec().auth_bearer("my_token").prepare(Method::GET, "/").unwrap();
        assert_eq!(bearer.header("Authorization"), Some("Bearer my_token"));
    }

    #[test]
    fn test_default_headers_from_config() {
        let mut config = AssayConfig::default();
        config
            .default_headers
            .insert("X-Custom".to_string(), "default-value".to_string());
        let request = RequestSpecification::with_config((), &config)
            .prepare(Method::GET, "/")
            .unwrap();
        assert_eq!(request.header("X-Custom"), Some("default-value"));
    }

    #[test]
    fn test_into_http_request() {
        let request = spec()
            .header("X-Test", "value")
            .prepare(Method::GET, "/users")
            .unwrap()
            .into_http_request();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().path(), "/users");
        assert_eq!(request.headers().get("X-Test").unwrap(), "value");
    }
}
