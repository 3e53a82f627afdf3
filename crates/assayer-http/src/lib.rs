//! # Assayer HTTP
//!
//! Runs the `given → when → then → extract` chain against a live server over
//! a real socket, using a blocking [`reqwest`] client.
//!
//! ```no_run
//! use assayer_core::prelude::*;
//!
//! # fn main() -> AssayResult<()> {
//! assayer_http::given(|spec| spec.base_uri("http://localhost").port(8080))
//!     .when(|s| s.get("/greeting"))?
//!     .then(|v| {
//!         v.status_code(200)
//!             .body("greeting", not(empty_or_null_string()));
//!     })?;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/assayer-http/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use assayer_core::{
    AssayError, AssayResult, PreparedRequest, RequestSender, RequestSpecification, Response,
    Transport,
};
use parking_lot::Mutex;
use reqwest::blocking::Client;

/// Request specification bound to the HTTP transport.
pub type HttpSpecification = RequestSpecification<HttpTransport>;

/// Sends requests over the network with a blocking `reqwest` client.
///
/// The client is built on first dispatch and shared by clones. Dispatching
/// from inside a Tokio runtime fails with [`AssayError::Dispatch`], since the
/// blocking client cannot run there.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    timeout: Option<Duration>,
    client: Arc<Mutex<Option<Client>>>,
}

impl HttpTransport {
    /// Creates a transport with reqwest's default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total timeout for each request.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            client: Arc::default(),
        }
    }

    /// The configured request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn client(&self) -> AssayResult<Client> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AssayError::dispatch_with("failed to create HTTP client", e))?;
        *slot = Some(client.clone());
        Ok(client)
    }
}

impl Transport for HttpTransport {
    fn dispatch(&self, request: PreparedRequest) -> AssayResult<Response> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(AssayError::dispatch(format!(
                "cannot send {} {} with the blocking HTTP transport from inside an async runtime",
                request.method, request.uri
            )));
        }

        let client = self.client()?;
        let url = request.uri.to_string();
        let mut req_builder = client.request(request.method.clone(), &url);

        for (name, value) in &request.headers {
            req_builder = req_builder.header(name, value);
        }
        if !request.body.is_empty() {
            req_builder = req_builder.body(request.body);
        }

        let response = req_builder.send().map_err(|e| {
            AssayError::dispatch_with(format!("{} {url} failed", request.method), e)
        })?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .map_err(|e| AssayError::BodyRead(format!("{url}: {e}")))?;

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "received response");

        let response = Response::new(status, headers, body);
        Ok(if version == http::Version::HTTP_11 {
            response
        } else {
            response.with_version(version)
        })
    }
}

/// A fresh specification using the thread's default configuration.
pub fn request_specification() -> HttpSpecification {
    RequestSpecification::new(HttpTransport::new())
}

/// Starts a chain: configures a fresh specification with `block`.
pub fn given<F>(block: F) -> HttpSpecification
where
    F: FnOnce(HttpSpecification) -> HttpSpecification,
{
    block(request_specification())
}

/// Dispatches with a default specification and no `given` stage.
pub fn when<F, R>(block: F) -> R
where
    F: FnOnce(&RequestSender<HttpTransport>) -> R,
{
    request_specification().when(block)
}
