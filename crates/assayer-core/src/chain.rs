//! The `given → when → then → extract` chain.
//!
//! Each stage hands its result to the next:
//!
//! - `given` (per backend) yields a [`RequestSpecification`];
//! - [`RequestSpecification::when`] runs a closure over a [`RequestSender`]
//!   and returns whatever it returns, normally `AssayResult<Response>`;
//! - [`ResponseChain::then`] validates with every expectation of the closure
//!   evaluated together;
//! - [`ResponseChain::extract`] / [`ValidatedChain::extract`] read values.
//!
//! ```
//! use assayer_core::prelude::*;
//!
//! # fn main() -> AssayResult<()> {
//! let spec = RequestSpecification::new(())
//!     .filter(|_req, _ctx: &FilterContext<'_>| {
//!         ResponseBuilder::new()
//!             .content_type(ContentType::Json)
//!             .body(r#"{"greeting":"Hello World"}"#)
//!             .build()
//!     });
//!
//! let greeting: String = spec
//!     .when(|s| s.get("/greeting"))?
//!     .then(|v| {
//!         v.status_code(200).body("greeting", not(empty_or_null_string()));
//!     })?
//!     .extract(|r| r.path("greeting"))?;
//!
//! assert_eq!(greeting, "Hello World");
//! # Ok(())
//! # }
//! ```

use std::panic::{self, AssertUnwindSafe};

use crate::assertion::AssertionFailure;
use crate::error::{AssayError, AssayResult};
use crate::extract::ExtractableResponse;
use crate::request::RequestSpecification;
use crate::response::Response;
use crate::sender::{RequestSender, Transport};
use crate::validation::ValidatableResponse;

/// Deferred-assertion control offered by some validatable responses.
pub trait SupportsDeferredAssertion {
    /// Stops checking expectations as they are registered.
    fn disable_eager_assert(&mut self);

    /// Evaluates every pending expectation, reporting all failures at once.
    fn force_validate(&mut self) -> Result<(), AssertionFailure>;
}

/// A response that expectations can be registered against.
pub trait Validatable {
    /// A read-only view for extraction.
    fn extractable(&self) -> ExtractableResponse<'_>;

    /// The deferred-assertion capability, if this type has one.
    ///
    /// Types returning `None` keep their own assertion behaviour inside
    /// `then`.
    fn deferred_assertion(&mut self) -> Option<&mut dyn SupportsDeferredAssertion> {
        None
    }
}

/// The result of a dispatch, convertible to its validatable form.
pub trait Dispatched {
    /// The validatable form of this response.
    type Validatable: Validatable;

    /// Converts into the validatable form.
    fn validatable(self) -> Self::Validatable;
}

impl Dispatched for Response {
    type Validatable = ValidatableResponse;

    fn validatable(self) -> ValidatableResponse {
        ValidatableResponse::new(self)
    }
}

impl<T: Transport> RequestSpecification<T> {
    /// Runs `block` with a sender for this specification and returns its result.
    pub fn when<R>(self, block: impl FnOnce(&RequestSender<T>) -> R) -> R {
        block(&RequestSender::new(self))
    }

    /// A sender for this specification, for use without a closure.
    pub fn sender(self) -> RequestSender<T> {
        RequestSender::new(self)
    }
}

/// `then` and `extract` on dispatched responses.
pub trait ResponseChain: Dispatched + Sized {
    /// Validates the response.
    ///
    /// Eager assertion is disabled for the duration of `block`, then every
    /// expectation it registered is evaluated, even if `block` panicked.
    /// A panic from `block` is resumed and takes precedence; otherwise any
    /// failed expectations are returned together as
    /// [`AssayError::Assertion`].
    ///
    /// # Errors
    ///
    /// Returns `AssayError::Assertion` if one or more expectations fail.
    ///
    /// # Panics
    ///
    /// Propagates any panic raised by `block`.
    fn then(self, block: impl FnOnce(&mut Self::Validatable)) -> AssayResult<Self::Validatable> {
        let mut validatable = self.validatable();

        if let Some(deferred) = validatable.deferred_assertion() {
            deferred.disable_eager_assert();
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| block(&mut validatable)));

        let forced = validatable
            .deferred_assertion()
            .map_or(Ok(()), |deferred| deferred.force_validate());

        match (outcome, forced) {
            (Err(payload), Err(failure)) => {
                tracing::warn!(
                    failed = failure.count(),
                    "validation block panicked; discarding aggregated failure:\n{failure}"
                );
                panic::resume_unwind(payload)
            }
            (Err(payload), Ok(())) => panic::resume_unwind(payload),
            (Ok(()), Err(failure)) => Err(AssayError::Assertion(failure)),
            (Ok(()), Ok(())) => Ok(validatable),
        }
    }

    /// Extracts a value without registering expectations.
    fn extract<R>(self, block: impl FnOnce(&ExtractableResponse<'_>) -> R) -> R {
        let validatable = self.validatable();
        block(&validatable.extractable())
    }
}

impl<D: Dispatched> ResponseChain for D {}

/// `extract` on already validated responses.
pub trait ValidatedChain: Validatable {
    /// Extracts a value; no further validation happens.
    fn extract<R>(&self, block: impl FnOnce(&ExtractableResponse<'_>) -> R) -> R {
        block(&self.extractable())
    }
}

impl<V: Validatable> ValidatedChain for V {}
