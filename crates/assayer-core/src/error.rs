//! Error types for assayer.
//!
//! [`AssayError`] is the single error type surfaced by every stage of the
//! chain. Configuration loading has its own [`ConfigError`], which converts
//! into [`AssayError::Config`].

use std::path::PathBuf;

use thiserror::Error;

use crate::assertion::AssertionFailure;

/// Result type alias using [`AssayError`].
pub type AssayResult<T> = Result<T, AssayError>;

/// Errors raised while building, dispatching, validating or extracting.
#[derive(Debug, Error)]
pub enum AssayError {
    /// The request could not be assembled (bad URI, unresolved path parameter).
    #[error("Request build error: {0}")]
    RequestBuild(String),

    /// A header name or value is not valid HTTP.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The transport failed to deliver the request or produce a response.
    #[error("Dispatch error: {message}")]
    Dispatch {
        /// Description of the failure.
        message: String,
        /// Underlying transport error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The response body could not be read.
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value found at a JSON path could not be converted to the requested type.
    #[error("Cannot extract path '{path}': {source}")]
    Extraction {
        /// The path that was extracted.
        path: String,
        /// Conversion failure.
        #[source]
        source: serde_json::Error,
    },

    /// One or more expectations registered in a validation block failed.
    #[error("{0}")]
    Assertion(#[from] AssertionFailure),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AssayError {
    /// Create a dispatch error without an underlying source.
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
            source: None,
        }
    }

    /// Create a dispatch error wrapping a transport error.
    pub fn dispatch_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Dispatch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the aggregated assertion failure, if this is one.
    #[must_use]
    pub fn as_assertion(&self) -> Option<&AssertionFailure> {
        match self {
            Self::Assertion(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read configuration file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parsing error.
    #[error("failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field with the invalid value.
        field: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },

    /// Environment variable parsing error.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: String,
    },

    /// Logging subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

impl ConfigError {
    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Create a new invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new environment variable parse error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_display() {
        let err = AssayError::dispatch("connection refused");
        assert_eq!(err.to_string(), "Dispatch error: connection refused");
    }

    #[test]
    fn test_dispatch_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = AssayError::dispatch_with("connect failed", io);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_assertion_error_displays_failure_verbatim() {
        let failure = AssertionFailure::new(vec!["Expected status code <400> but was <200>.\n".into()]);
        let err = AssayError::from(failure);
        assert_eq!(
            err.to_string(),
            "1 expectation failed.\nExpected status code <400> but was <200>.\n"
        );
        assert!(err.as_assertion().is_some());
    }

    #[test]
    fn test_config_errors() {
        let err = ConfigError::file_not_found("/path/to/assayer.toml");
        assert!(err.to_string().contains("/path/to/assayer.toml"));

        let err = ConfigError::invalid_value("port", "must not be zero");
        assert!(err.to_string().contains("port"));
        assert!(err.to_string().contains("must not be zero"));

        let err = ConfigError::env_parse_error("ASSAYER__PORT", "expected integer");
        assert!(err.to_string().contains("ASSAYER__PORT"));
    }
}
