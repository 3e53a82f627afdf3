//! Reading values out of responses.

use std::collections::BTreeMap;

use http::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::AssayResult;
use crate::json_path::JsonPath;
use crate::response::Response;

/// Read-only view over a [`Response`] used to pull values out of it.
///
/// Extraction never registers expectations; a missing path or a value of the
/// wrong type is reported as an error rather than replaced by a default.
#[derive(Debug, Clone, Copy)]
pub struct ExtractableResponse<'a> {
    response: &'a Response,
}

impl<'a> ExtractableResponse<'a> {
    /// Creates a view over `response`.
    #[must_use]
    pub fn new(response: &'a Response) -> Self {
        Self { response }
    }

    /// Reads the JSON value at `path` as `T`.
    ///
    /// Use `Option<T>` to accept a missing value.
    pub fn path<T: DeserializeOwned>(&self, path: &str) -> AssayResult<T> {
        self.json_path()?.get(path)
    }

    /// Parses the body for repeated path lookups.
    pub fn json_path(&self) -> AssayResult<JsonPath> {
        self.response.json_path()
    }

    /// A header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.response.header(name)
    }

    /// All headers.
    #[must_use]
    pub fn headers(&self) -> &'a HeaderMap {
        self.response.headers()
    }

    /// A cookie set by the response.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.response.cookie(name)
    }

    /// Every cookie set by the response, by name.
    #[must_use]
    pub fn cookies(&self) -> BTreeMap<String, String> {
        self.response
            .cookies()
            .into_iter()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect()
    }

    /// The status code.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.response.status_code()
    }

    /// The status line.
    #[must_use]
    pub fn status_line(&self) -> &'a str {
        self.response.status_line()
    }

    /// The Content-Type header.
    #[must_use]
    pub fn content_type(&self) -> Option<&'a str> {
        self.response.content_type()
    }

    /// The body as text.
    pub fn body_as_string(&self) -> AssayResult<String> {
        self.response.text()
    }

    /// The raw body.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.response.body()
    }

    /// Deserializes the whole body.
    pub fn as_json<T: DeserializeOwned>(&self) -> AssayResult<T> {
        self.response.json()
    }

    /// The underlying response.
    #[must_use]
    pub fn response(&self) -> &'a Response {
        self.response
    }
}
