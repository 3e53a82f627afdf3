//! # Assayer Core
//!
//! Request specification, response validation and extraction for the
//! `given → when → then → extract` testing chain. The backend crates
//! (`assayer-http`, `assayer-mock`, `assayer-client`) supply a
//! [`Transport`]; everything else lives here.
//!
//! ## Key Features
//!
//! - **Request specification**: base URI, port, base path, headers, query /
//!   form / path parameters, cookies, JSON bodies, basic and bearer auth
//! - **Filters**: wrap or short-circuit dispatch
//! - **Hamcrest-style matchers** with familiar failure descriptions
//! - **JSON paths**: `user.name`, `items[0]`, `items.name`, `items.size()`
//! - **Deferred validation**: every failed expectation of a `then` block is
//!   reported in one [`AssertionFailure`]
//! - **Thread-scoped defaults** ([`config`]) loadable from TOML, JSON and the
//!   environment ([`ConfigLoader`])
//!
//! ## Example
//!
//! ```
//! use assayer_core::prelude::*;
//!
//! # fn main() -> AssayResult<()> {
//! let spec = RequestSpecification::new(()).filter(|_req, _ctx: &FilterContext<'_>| {
//!     ResponseBuilder::new()
//!         .content_type(ContentType::Json)
//!         .body(r#"{"message":"Hello World"}"#)
//!         .build()
//! });
//!
//! let err = spec
//!     .when(|s| s.get("/greeting"))?
//!     .then(|v| {
//!         v.status_code(400)
//!             .body("message", equal_to("Another World"));
//!     })
//!     .unwrap_err();
//!
//! assert_eq!(err.as_assertion().map(AssertionFailure::count), Some(2));
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/assayer-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod assertion;
mod chain;
pub mod config;
mod content_type;
mod error;
mod extract;
mod filter;
pub mod json_path;
mod loader;
pub mod logging;
pub mod matcher;
mod request;
mod response;
mod sender;
mod validation;

pub use assertion::AssertionFailure;
pub use chain::{
    Dispatched, ResponseChain, SupportsDeferredAssertion, Validatable, ValidatedChain,
};
pub use config::AssayConfig;
pub use content_type::ContentType;
pub use error::{AssayError, AssayResult, ConfigError};
pub use extract::ExtractableResponse;
pub use filter::{Filter, FilterContext};
pub use json_path::JsonPath;
pub use loader::ConfigLoader;
pub use logging::LogDetail;
pub use request::{PreparedRequest, RequestSpecification};
pub use response::{Response, ResponseBuilder};
pub use sender::{RequestSender, Transport};
pub use validation::ValidatableResponse;

// Re-export for building requests and responses by hand
pub use http;

/// Everything a test needs to write chains.
pub mod prelude {
    pub use crate::chain::{ResponseChain, ValidatedChain};
    pub use crate::matcher::{
        all_of, any_of, anything, contains_string, empty_or_null_string, ends_with, equal_to,
        greater_than, greater_than_or_equal_to, has_item, has_key, has_size, less_than,
        less_than_or_equal_to, matches_pattern, not, not_null_value, null_value, starts_with,
        IntoMatcher, Matcher,
    };
    pub use crate::{
        AssayError, AssayResult, AssertionFailure, ContentType, ExtractableResponse,
        FilterContext, LogDetail, PreparedRequest, RequestSpecification, Response,
        ResponseBuilder, ValidatableResponse,
    };
}
