//! # Assayer
//!
//! **Fluent `given → when → then → extract` testing for HTTP services**
//!
//! - **One chain, three backends**: a real socket ([`http`]), an in-process
//!   router ([`mock`]) or async handlers behind a test client ([`client`])
//! - **Deferred validation**: every failed expectation of a `then` block is
//!   reported together, in declaration order
//! - **Hamcrest-style matchers** and JSON-path extraction
//! - **A mock server** ([`server`]) with queued responses for integration tests
//!
//! ## Quick Start
//!
//! ```no_run
//! use assayer::prelude::*;
//!
//! # fn main() -> AssayResult<()> {
//! let greeting: String = assayer::http::given(|spec| spec.port(8080))
//!     .when(|s| s.get("/greeting"))?
//!     .then(|v| {
//!         v.status_code(200)
//!             .body("greeting", not(empty_or_null_string()));
//!     })?
//!     .extract(|r| r.path("greeting"))?;
//! # let _ = greeting;
//! # Ok(())
//! # }
//! ```
//!
//! ## Stages
//!
//! ```text
//! given(block) → when(block) → then(block) → extract(block)
//!   build         dispatch      validate       extract
//! ```
//!
//! `then` and `extract` are both optional.

#![doc(html_root_url = "https://docs.rs/assayer/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Request specification, validation and extraction
pub use assayer_core as core;

// Blocking HTTP backend
pub use assayer_http as http;

// In-process mock application backend
pub use assayer_mock as mock;

// Async test-client backend
pub use assayer_client as client;

// Mock HTTP server for integration tests
pub use assayer_server as server;

pub use assayer_core::{config, logging, matcher};

/// Everything a test needs to write chains with any backend.
pub mod prelude {
    pub use assayer_core::prelude::*;

    pub use assayer_core::{AssayConfig, ConfigLoader, Filter};

    pub use assayer_client::{ClientSpecificationExt, WebTestClient};
    pub use assayer_mock::{MockApp, MockRequest, MockSpecificationExt};
    pub use assayer_server::{MockResponse, MockServer, RecordedRequest};
}
