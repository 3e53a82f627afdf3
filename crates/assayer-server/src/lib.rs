//! # Assayer Server
//!
//! A local HTTP/1.1 server for integration tests. Queue canned
//! [`MockResponse`]s, point a chain at [`MockServer::url`], then inspect what
//! arrived with [`MockServer::take_request`].
//!
//! Each test owns its server; dropping it shuts the server down.

#![doc(html_root_url = "https://docs.rs/assayer-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod exchange;
mod server;
mod shutdown;

pub use error::{ServerError, ServerResult};
pub use exchange::{MockResponse, RecordedRequest};
pub use server::MockServer;
