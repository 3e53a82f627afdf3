//! # Assayer Client
//!
//! Runs the `given → when → then → extract` chain against async handlers
//! through a [`WebTestClient`]. Each dispatch drives the handler to
//! completion on a private current-thread Tokio runtime, so the chain stays
//! synchronous.
//!
//! Chains must not run inside an async runtime; dispatching from one fails
//! with a [`Dispatch`](assayer_core::AssayError::Dispatch) error. Use
//! [`WebTestClient::exchange`] directly in async tests.
//!
//! ```
//! use assayer_client::{ClientSpecificationExt, WebTestClient};
//! use assayer_core::prelude::*;
//!
//! # fn main() -> AssayResult<()> {
//! let method: String = assayer_client::given(|spec| spec.client(WebTestClient::echo()))
//!     .when(|s| s.put("/items/1"))?
//!     .then(|v| {
//!         v.status_code(200).body("path", "/items/1");
//!     })?
//!     .extract(|r| r.path("method"))?;
//! assert_eq!(method, "PUT");
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/assayer-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;

use std::cell::RefCell;

use assayer_core::{
    AssayError, AssayResult, PreparedRequest, RequestSender, RequestSpecification, Response,
    Transport,
};

pub use client::{ClientHandler, HandlerResponse, WebTestClient};

/// Request specification bound to the client transport.
pub type ClientSpecification = RequestSpecification<ClientTransport>;

thread_local! {
    static DEFAULT_CLIENT: RefCell<Option<WebTestClient>> = const { RefCell::new(None) };
}

/// Installs `client` as this thread's default test client.
pub fn web_test_client(client: WebTestClient) {
    DEFAULT_CLIENT.with(|slot| *slot.borrow_mut() = Some(client));
}

/// Removes this thread's default test client.
pub fn reset() {
    DEFAULT_CLIENT.with(|slot| *slot.borrow_mut() = None);
}

/// Dispatches requests through a [`WebTestClient`], blocking until the
/// handler completes.
#[derive(Debug, Clone, Default)]
pub struct ClientTransport(Option<WebTestClient>);

impl ClientTransport {
    /// A transport for `client`.
    pub fn new(client: WebTestClient) -> Self {
        Self(Some(client))
    }

    /// A transport for this thread's default client, if any.
    pub fn current() -> Self {
        Self(DEFAULT_CLIENT.with(|slot| slot.borrow().clone()))
    }

    /// The client requests go to.
    pub fn client(&self) -> Option<&WebTestClient> {
        self.0.as_ref()
    }
}

impl Transport for ClientTransport {
    fn dispatch(&self, request: PreparedRequest) -> AssayResult<Response> {
        let Some(client) = &self.0 else {
            return Err(AssayError::dispatch(format!(
                "no test client configured for {} {}; call assayer_client::web_test_client or set one with `client`",
                request.method, request.uri
            )));
        };

        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(AssayError::dispatch(format!(
                "cannot block on {} {} from inside an async runtime; await WebTestClient::exchange instead",
                request.method, request.uri
            )));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AssayError::dispatch_with("failed to create test client runtime", e))?;

        runtime.block_on(client.exchange(request.into_http_request()))
    }
}

/// Client-specific configuration of a specification.
pub trait ClientSpecificationExt {
    /// Sends this specification's requests through `client`.
    #[must_use]
    fn client(self, client: WebTestClient) -> Self;
}

impl ClientSpecificationExt for ClientSpecification {
    fn client(mut self, client: WebTestClient) -> Self {
        *self.transport_mut() = ClientTransport::new(client);
        self
    }
}

/// A fresh specification using the thread's default configuration and
/// default client.
pub fn request_specification() -> ClientSpecification {
    RequestSpecification::new(ClientTransport::current())
}

/// Starts a chain: configures a fresh specification with `block`.
pub fn given<F>(block: F) -> ClientSpecification
where
    F: FnOnce(ClientSpecification) -> ClientSpecification,
{
    block(request_specification())
}

/// Dispatches with a default specification and no `given` stage.
pub fn when<F, R>(block: F) -> R
where
    F: FnOnce(&RequestSender<ClientTransport>) -> R,
{
    request_specification().when(block)
}
