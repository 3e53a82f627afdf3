//! Request/response logging and subscriber setup.
//!
//! Requests and responses are logged as `tracing` events at `info` level
//! when a specification or a validation asks for it. Tests that want to see
//! those events install a subscriber once:
//!
//! ```rust,ignore
//! use assayer_core::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::for_tests())?;
//! ```

use std::fmt::Write as _;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::TestWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::ConfigError;
use crate::request::PreparedRequest;
use crate::response::Response;

/// Which parts of a request or response to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogDetail {
    /// Everything below.
    All,
    /// The request method (requests only).
    Method,
    /// The request URI (requests only).
    Uri,
    /// Headers.
    Headers,
    /// Cookies.
    Cookies,
    /// The body.
    Body,
    /// The status line (responses only).
    Status,
}

impl LogDetail {
    fn includes(self, part: Self) -> bool {
        self == Self::All || self == part
    }
}

/// Logs a prepared request at `info` level.
pub fn log_request(request: &PreparedRequest, detail: LogDetail) {
    let mut out = String::new();
    if detail.includes(LogDetail::Method) {
        let _ = writeln!(out, "Request method:\t{}", request.method);
    }
    if detail.includes(LogDetail::Uri) {
        let _ = writeln!(out, "Request URI:\t{}", request.uri);
    }
    if detail.includes(LogDetail::Headers) {
        write_headers(&mut out, "Headers:", request.headers.iter());
    }
    if detail.includes(LogDetail::Cookies) {
        let _ = writeln!(out, "Cookies:\t{}", request.header("cookie").unwrap_or("<none>"));
    }
    if detail.includes(LogDetail::Body) {
        let _ = writeln!(out, "Body:\n{}", String::from_utf8_lossy(&request.body));
    }
    tracing::info!(method = %request.method, uri = %request.uri, "request\n{out}");
}

/// Logs a response at `info` level.
pub fn log_response(response: &Response, detail: LogDetail) {
    let mut out = String::new();
    if detail.includes(LogDetail::Status) {
        let _ = writeln!(out, "{}", response.status_line());
    }
    if detail.includes(LogDetail::Headers) {
        write_headers(&mut out, "", response.headers().iter());
    }
    if detail.includes(LogDetail::Cookies) {
        for cookie in response.cookies() {
            let _ = writeln!(out, "{cookie}");
        }
    }
    if detail.includes(LogDetail::Body) {
        let _ = writeln!(out, "\n{}", String::from_utf8_lossy(response.body()));
    }
    tracing::info!(status = response.status_code(), "response\n{out}");
}

fn write_headers<'a>(
    out: &mut String,
    title: &str,
    headers: impl Iterator<Item = (&'a http::HeaderName, &'a http::HeaderValue)>,
) {
    if !title.is_empty() {
        let _ = writeln!(out, "{title}");
    }
    for (name, value) in headers {
        let _ = writeln!(out, "{name}: {}", value.to_str().unwrap_or("<binary>"));
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "assayer_core=debug").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include span events (enter, exit, close).
    pub span_events: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Write through libtest's capture instead of stderr.
    pub test_writer: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: false,
            span_events: false,
            include_target: true,
            test_writer: false,
        }
    }
}

impl LogConfig {
    /// Human readable output captured per test, with dispatch details.
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            level: "debug".to_string(),
            test_writer: true,
            ..Self::default()
        }
    }

    /// JSON output, for CI log collection.
    #[must_use]
    pub fn json() -> Self {
        Self {
            json_format: true,
            ..Self::default()
        }
    }
}

/// Installs a global `tracing` subscriber.
///
/// # Errors
///
/// Returns `ConfigError::LoggingInit` if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let writer = if config.test_writer {
        BoxMakeWriter::new(TestWriter::new())
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_target(config.include_target)
            .with_writer(writer)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| ConfigError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_span_events(span_events)
            .with_target(config.include_target)
            .with_writer(writer)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| ConfigError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(filter)
        .map_err(|e| ConfigError::LoggingInit(format!("Invalid log level: {e}")))
}
