//! # Assayer Mock
//!
//! Runs the `given → when → then → extract` chain against an in-process
//! [`MockApp`], with no network involved.
//!
//! The application is either installed for the current thread with
//! [`standalone_setup`] or attached to one specification with
//! [`MockSpecificationExt::app`].
//!
//! ```
//! use assayer_core::prelude::*;
//! use assayer_mock::{MockApp, MockSpecificationExt};
//!
//! # fn main() -> AssayResult<()> {
//! let app = MockApp::new().get("/greeting", |_req| {
//!     ResponseBuilder::new()
//!         .content_type(ContentType::Json)
//!         .body(r#"{"greeting":"Hello World"}"#)
//!         .build()
//! });
//!
//! let greeting: String = assayer_mock::given(|spec| spec.app(app))
//!     .when(|s| s.get("/greeting"))?
//!     .then(|v| {
//!         v.status_code(200);
//!     })?
//!     .extract(|r| r.path("greeting"))?;
//! assert_eq!(greeting, "Hello World");
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/assayer-mock/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod router;

use std::cell::RefCell;
use std::sync::Arc;

use assayer_core::{AssayResult, PreparedRequest, RequestSender, RequestSpecification, Response, Transport};

pub use app::{Handler, MockApp, MockRequest};
pub use router::PathPattern;

/// Request specification bound to the mock transport.
pub type MockSpecification = RequestSpecification<MockTransport>;

thread_local! {
    static STANDALONE: RefCell<Option<Arc<MockApp>>> = const { RefCell::new(None) };
}

/// Installs `app` as this thread's default mock application.
pub fn standalone_setup(app: MockApp) {
    STANDALONE.with(|slot| *slot.borrow_mut() = Some(Arc::new(app)));
}

/// Removes this thread's default mock application.
pub fn reset() {
    STANDALONE.with(|slot| *slot.borrow_mut() = None);
}

/// Dispatches requests to a [`MockApp`] in-process.
#[derive(Debug, Clone, Default)]
pub struct MockTransport(Option<Arc<MockApp>>);

impl MockTransport {
    /// A transport for `app`.
    pub fn new(app: impl Into<Arc<MockApp>>) -> Self {
        Self(Some(app.into()))
    }

    /// A transport for this thread's standalone application, if any.
    pub fn current() -> Self {
        Self(STANDALONE.with(|slot| slot.borrow().clone()))
    }

    /// The application requests go to.
    pub fn app(&self) -> Option<&MockApp> {
        self.0.as_deref()
    }
}

impl Transport for MockTransport {
    fn dispatch(&self, request: PreparedRequest) -> AssayResult<Response> {
        match &self.0 {
            Some(app) => app.handle(request),
            None => Err(app::no_application(&request)),
        }
    }
}

/// Mock-specific configuration of a specification.
pub trait MockSpecificationExt {
    /// Sends this specification's requests to `app`.
    #[must_use]
    fn app(self, app: impl Into<Arc<MockApp>>) -> Self;
}

impl MockSpecificationExt for MockSpecification {
    fn app(mut self, app: impl Into<Arc<MockApp>>) -> Self {
        *self.transport_mut() = MockTransport::new(app);
        self
    }
}

/// A fresh specification using the thread's default configuration and
/// standalone application.
pub fn request_specification() -> MockSpecification {
    RequestSpecification::new(MockTransport::current())
}

/// Starts a chain: configures a fresh specification with `block`.
pub fn given<F>(block: F) -> MockSpecification
where
    F: FnOnce(MockSpecification) -> MockSpecification,
{
    block(request_specification())
}

/// Dispatches with a default specification and no `given` stage.
pub fn when<F, R>(block: F) -> R
where
    F: FnOnce(&RequestSender<MockTransport>) -> R,
{
    request_specification().when(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assayer_core::{AssayError, ResponseBuilder};

    #[test]
    fn test_without_app_dispatch_fails() {
        reset();
        let err = when(|s| s.get("/greeting")).unwrap_err();
        assert!(matches!(err, AssayError::Dispatch { .. }));
        assert!(err.to_string().contains("no mock application configured for GET"));
    }

    #[test]
    fn test_standalone_setup_is_per_thread() {
        standalone_setup(MockApp::new().get("/", |_req| ResponseBuilder::new().build()));
        assert!(MockTransport::current().app().is_some());

        let other = std::thread::spawn(|| MockTransport::current().app().is_none())
            .join()
            .unwrap();
        assert!(other);

        reset();
        assert!(MockTransport::current().app().is_none());
    }

    #[test]
    fn test_app_overrides_standalone() {
        standalone_setup(MockApp::new());
        let response = given(|s| {
            s.app(MockApp::new().get("/x", |_req| ResponseBuilder::new().status_code(202).build()))
        })
        .when(|s| s.get("/x"))
        .unwrap();
        reset();
        assert_eq!(response.status_code(), 202);
    }
}
