//! Default request and validation configuration.
//!
//! Every new [`RequestSpecification`](crate::RequestSpecification) and
//! [`ValidatableResponse`](crate::ValidatableResponse) starts from the
//! configuration installed on the current thread. Test harnesses install it
//! before a chain and reset it afterwards:
//!
//! ```
//! use assayer_core::config::{self, AssayConfig};
//!
//! config::configure(|c| c.port = 7000);
//! assert_eq!(config::current().port, 7000);
//! config::reset();
//! assert_eq!(config::current(), AssayConfig::default());
//! ```
//!
//! The configuration is thread-scoped, so tests running in parallel do not
//! see each other's settings.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AssayResult, ConfigError};
use crate::filter::{Filter, FilterContext};
use crate::request::PreparedRequest;
use crate::response::Response;

/// Defaults applied to every chain on the installing thread.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssayConfig {
    /// Base URI, e.g. `http://localhost`.
    pub base_uri: String,

    /// Port used when the base URI carries none.
    pub port: u16,

    /// Path prefix placed before every request path.
    pub base_path: String,

    /// Root path prepended to JSON paths in validations.
    pub root_path: String,

    /// Whether parameters are percent-encoded.
    pub url_encoding_enabled: bool,

    /// Log the response when a validation fails.
    pub log_if_validation_fails: bool,

    /// Headers added to every request.
    pub default_headers: BTreeMap<String, String>,

    /// Filters run before per-request filters.
    #[serde(skip)]
    pub filters: Vec<Arc<dyn Filter>>,
}

impl Default for AssayConfig {
    fn default() -> Self {
        Self {
            base_uri: "http://localhost".to_string(),
            port: 8080,
            base_path: String::new(),
            root_path: String::new(),
            url_encoding_enabled: true,
            log_if_validation_fails: false,
            default_headers: BTreeMap::new(),
            filters: Vec::new(),
        }
    }
}

impl fmt::Debug for AssayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssayConfig")
            .field("base_uri", &self.base_uri)
            .field("port", &self.port)
            .field("base_path", &self.base_path)
            .field("root_path", &self.root_path)
            .field("url_encoding_enabled", &self.url_encoding_enabled)
            .field("log_if_validation_fails", &self.log_if_validation_fails)
            .field("default_headers", &self.default_headers)
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Filters are compared by identity.
impl PartialEq for AssayConfig {
    fn eq(&self, other: &Self) -> bool {
        self.base_uri == other.base_uri
            && self.port == other.port
            && self.base_path == other.base_path
            && self.root_path == other.root_path
            && self.url_encoding_enabled == other.url_encoding_enabled
            && self.log_if_validation_fails == other.log_if_validation_fails
            && self.default_headers == other.default_headers
            && self.filters.len() == other.filters.len()
            && self
                .filters
                .iter()
                .zip(&other.filters)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

impl AssayConfig {
    /// Adds a global filter closure. [`Filter`] implementations can be
    /// pushed onto `filters` directly.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(PreparedRequest, &FilterContext<'_>) -> AssayResult<Response> + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Checks the configuration for values that cannot produce a request.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_uri.trim().is_empty() {
            return Err(ConfigError::invalid_value("base_uri", "must not be empty"));
        }
        if let Some((scheme, _)) = self.base_uri.split_once("://") {
            if scheme != "http" && scheme != "https" {
                return Err(ConfigError::invalid_value(
                    "base_uri",
                    format!("unsupported scheme '{scheme}'"),
                ));
            }
        }
        if self.port == 0 {
            return Err(ConfigError::invalid_value("port", "must not be zero"));
        }
        if self.base_uri.contains(char::is_whitespace) {
            return Err(ConfigError::invalid_value(
                "base_uri",
                "must not contain whitespace",
            ));
        }
        Ok(())
    }
}

thread_local! {
    static CURRENT: RefCell<AssayConfig> = RefCell::new(AssayConfig::default());
}

/// Installs `config` as this thread's default.
pub fn install(config: AssayConfig) {
    CURRENT.with(|current| *current.borrow_mut() = config);
}

/// Modifies this thread's default in place.
pub fn configure(f: impl FnOnce(&mut AssayConfig)) {
    CURRENT.with(|current| f(&mut current.borrow_mut()));
}

/// A copy of this thread's default.
#[must_use]
pub fn current() -> AssayConfig {
    CURRENT.with(|current| current.borrow().clone())
}

/// Restores the built-in defaults on this thread.
pub fn reset() {
    install(AssayConfig::default());
}
