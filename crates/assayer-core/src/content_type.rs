//! Common content types.

use std::fmt;

use serde_json::Value;

use crate::matcher::Matcher;

/// Well known content types.
///
/// A `ContentType` is also a [`Matcher`]: it matches any `Content-Type`
/// header value starting with one of its MIME types, ignoring case and
/// parameters such as `charset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// `application/json`
    Json,
    /// `application/xml`
    Xml,
    /// `text/html`
    Html,
    /// `text/plain`
    Text,
    /// `application/x-www-form-urlencoded`
    UrlEnc,
    /// `application/octet-stream`
    Binary,
    /// `*/*`
    Any,
}

impl ContentType {
    /// The MIME type sent in request headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.mime_types()[0]
    }

    /// Every MIME type considered equivalent to this content type.
    #[must_use]
    pub fn mime_types(&self) -> &'static [&'static str] {
        match self {
            Self::Json => &["application/json", "application/javascript", "text/javascript", "text/json"],
            Self::Xml => &["application/xml", "text/xml", "application/xhtml+xml"],
            Self::Html => &["text/html"],
            Self::Text => &["text/plain"],
            Self::UrlEnc => &["application/x-www-form-urlencoded"],
            Self::Binary => &["application/octet-stream"],
            Self::Any => &["*/*"],
        }
    }

    /// Returns `true` if the header value denotes this content type.
    #[must_use]
    pub fn matches_header(&self, header: &str) -> bool {
        if *self == Self::Any {
            return true;
        }
        let header = header.trim().to_ascii_lowercase();
        self.mime_types().iter().any(|mime| header.starts_with(mime))
    }
}

impl AsRef<str> for ContentType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Matcher for ContentType {
    fn matches(&self, actual: &Value) -> bool {
        actual.as_str().is_some_and(|header| self.matches_header(header))
    }

    fn describe(&self) -> String {
        format!("\"{}\"", self.as_str())
    }
}
