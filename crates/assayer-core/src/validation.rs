//! Response validation.
//!
//! A [`ValidatableResponse`] collects expectations against a dispatched
//! response. By default each expectation is checked the moment it is
//! registered and a failure panics, like `assert!`. In deferred mode (what
//! the `then` stage of a chain uses) expectations accumulate and are checked
//! together by [`force_validate`](SupportsDeferredAssertion::force_validate),
//! which reports every failure in one [`AssertionFailure`].

use std::fmt;

use serde_json::Value;

use crate::assertion::AssertionFailure;
use crate::chain::{SupportsDeferredAssertion, Validatable};
use crate::config::{self, AssayConfig};
use crate::extract::ExtractableResponse;
use crate::json_path::{self, join_paths};
use crate::logging::{self, LogDetail};
use crate::matcher::{not_null_value, remove_quotes_if_string, BoxMatcher, IntoMatcher};
use crate::response::Response;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    StatusCode,
    StatusLine,
    Header(String),
    ContentType,
    Cookie(String),
    Body,
    Path(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusCode => f.write_str("status code"),
            Self::StatusLine => f.write_str("status line"),
            Self::Header(name) => write!(f, "header {name}"),
            Self::ContentType => f.write_str("content-type"),
            Self::Cookie(name) => write!(f, "cookie {name}"),
            Self::Body => f.write_str("body"),
            Self::Path(path) => write!(f, "JSON path {path}"),
        }
    }
}

struct Expectation {
    target: Target,
    matcher: BoxMatcher,
}

/// A response together with the expectations registered against it.
pub struct ValidatableResponse {
    response: Response,
    expectations: Vec<Expectation>,
    root_path: String,
    eager: bool,
    log_if_validation_fails: bool,
}

impl ValidatableResponse {
    /// Wraps `response` using this thread's configuration.
    #[must_use]
    pub fn new(response: Response) -> Self {
        Self::with_config(response, &config::current())
    }

    /// Wraps `response` using an explicit configuration.
    #[must_use]
    pub fn with_config(response: Response, config: &AssayConfig) -> Self {
        Self {
            response,
            expectations: Vec::new(),
            root_path: config.root_path.clone(),
            eager: true,
            log_if_validation_fails: config.log_if_validation_fails,
        }
    }

    /// The response under validation.
    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Number of expectations registered but not yet evaluated.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.expectations.len()
    }

    /// Expects the status code to match.
    ///
    /// # Panics
    ///
    /// In eager mode, panics if the expectation fails.
    pub fn status_code(&mut self, matcher: impl IntoMatcher) -> &mut Self {
        self.register(Target::StatusCode, matcher.into_matcher())
    }

    /// Expects the status line to match.
    ///
    /// # Panics
    ///
    /// In eager mode, panics if the expectation fails.
    pub fn status_line(&mut self, matcher: impl IntoMatcher) -> &mut Self {
        self.register(Target::StatusLine, matcher.into_matcher())
    }

    /// Expects a header value to match. A missing header is matched as `null`.
    ///
    /// # Panics
    ///
    /// In eager mode, panics if the expectation fails.
    pub fn header(&mut self, name: impl Into<String>, matcher: impl IntoMatcher) -> &mut Self {
        self.register(Target::Header(name.into()), matcher.into_matcher())
    }

    /// Expects the Content-Type header to match. Accepts a
    /// [`ContentType`](crate::ContentType) or any other matcher.
    ///
    /// # Panics
    ///
    /// In eager mode, panics if the expectation fails.
    pub fn content_type(&mut self, matcher: impl IntoMatcher) -> &mut Self {
        self.register(Target::ContentType, matcher.into_matcher())
    }

    /// Expects a cookie value to match.
    ///
    /// # Panics
    ///
    /// In eager mode, panics if the expectation fails.
    pub fn cookie(&mut self, name: impl Into<String>, matcher: impl IntoMatcher) -> &mut Self {
        self.register(Target::Cookie(name.into()), matcher.into_matcher())
    }

    /// Expects the response to set a cookie named `name`.
    ///
    /// # Panics
    ///
    /// In eager mode, panics if the expectation fails.
    pub fn has_cookie(&mut self, name: impl Into<String>) -> &mut Self {
        self.register(Target::Cookie(name.into()), Box::new(not_null_value()))
    }

    /// Expects the value at a JSON path (below the root path) to match.
    ///
    /// # Panics
    ///
    /// In eager mode, panics if the expectation fails.
    pub fn body(&mut self, path: &str, matcher: impl IntoMatcher) -> &mut Self {
        let path = join_paths(&self.root_path, path);
        self.register(Target::Path(path), matcher.into_matcher())
    }

    /// Expects the whole body, as text, to match.
    ///
    /// # Panics
    ///
    /// In eager mode, panics if the expectation fails.
    pub fn body_matches(&mut self, matcher: impl IntoMatcher) -> &mut Self {
        self.register(Target::Body, matcher.into_matcher())
    }

    /// Sets the root path prepended to later `body` paths.
    pub fn root_path(&mut self, root: impl Into<String>) -> &mut Self {
        self.root_path = root.into();
        self
    }

    /// Appends to the current root path.
    pub fn append_root_path(&mut self, path: &str) -> &mut Self {
        self.root_path = join_paths(&self.root_path, path);
        self
    }

    /// Clears the root path.
    pub fn no_root_path(&mut self) -> &mut Self {
        self.root_path.clear();
        self
    }

    /// Logs the response now with the given detail.
    pub fn log(&mut self, detail: LogDetail) -> &mut Self {
        logging::log_response(&self.response, detail);
        self
    }

    /// Logs the response if a later validation fails.
    pub fn log_if_validation_fails(&mut self) -> &mut Self {
        self.log_if_validation_fails = true;
        self
    }

    fn register(&mut self, target: Target, matcher: BoxMatcher) -> &mut Self {
        tracing::trace!(expectation = %target, matcher = %matcher.describe(), "registered expectation");
        self.expectations.push(Expectation { target, matcher });

        if self.eager {
            if let Err(failure) = self.validate_pending() {
                panic!("{failure}");
            }
        }
        self
    }

    fn validate_pending(&mut self) -> Result<(), AssertionFailure> {
        let expectations = std::mem::take(&mut self.expectations);
        let mut body_json = None;
        let failures: Vec<String> = expectations
            .iter()
            .filter_map(|expectation| self.check(expectation, &mut body_json))
            .collect();

        if failures.is_empty() {
            return Ok(());
        }

        let failure = AssertionFailure::new(failures);
        if self.log_if_validation_fails {
            tracing::warn!(failed = failure.count(), response = ?self.response, "response validation failed");
        }
        Err(failure)
    }

    fn check(&self, expectation: &Expectation, body_json: &mut Option<Option<Value>>) -> Option<String> {
        let matcher = &expectation.matcher;
        let description = matcher.describe();

        match &expectation.target {
            Target::StatusCode => {
                let actual = self.response.status_code();
                (!matcher.matches(&Value::from(actual)))
                    .then(|| format!("Expected status code {description} but was <{actual}>.\n"))
            }
            Target::StatusLine => {
                let actual = self.response.status_line();
                (!matcher.matches(&Value::from(actual))).then(|| {
                    format!(
                        "Expected status line {description} doesn't match actual status line \"{actual}\".\n"
                    )
                })
            }
            Target::Header(name) => {
                let actual = self.response.header(name);
                let value = actual.map_or(Value::Null, Value::from);
                (!matcher.matches(&value)).then(|| {
                    let headers: Vec<String> = self
                        .response
                        .headers()
                        .iter()
                        .map(|(k, v)| format!("{k}={}", v.to_str().unwrap_or("<binary>")))
                        .collect();
                    format!(
                        "Expected header \"{name}\" was not {description}, was \"{}\". Headers are:\n{}\n",
                        actual.unwrap_or("null"),
                        headers.join("\n")
                    )
                })
            }
            Target::ContentType => {
                let actual = self.response.content_type().unwrap_or("");
                (!matcher.matches(&Value::from(actual))).then(|| {
                    format!(
                        "Expected content-type {description} doesn't match actual content-type \"{actual}\".\n"
                    )
                })
            }
            Target::Cookie(name) => {
                let actual = self.response.cookie(name);
                let value = actual.clone().map_or(Value::Null, Value::from);
                if matcher.matches(&value) {
                    return None;
                }
                Some(match actual {
                    Some(actual) => format!(
                        "Expected cookie \"{name}\" was not {description}, was \"{actual}\".\n"
                    ),
                    None => {
                        let cookies: Vec<String> = self
                            .response
                            .cookies()
                            .iter()
                            .map(|c| format!("{}={}", c.name(), c.value()))
                            .collect();
                        format!(
                            "Cookie \"{name}\" was not defined in the response. Cookies are: \n{}\n",
                            cookies.join("\n")
                        )
                    }
                })
            }
            Target::Body => {
                let actual = String::from_utf8_lossy(self.response.body());
                (!matcher.matches(&Value::from(actual.as_ref()))).then(|| {
                    format!("Response body doesn't match expectation.\nExpected: {description}\n  Actual: {actual}\n")
                })
            }
            Target::Path(path) => {
                let parsed = body_json
                    .get_or_insert_with(|| serde_json::from_slice(self.response.body()).ok());
                let Some(document) = parsed else {
                    return Some(format!(
                        "Cannot evaluate JSON path {path}: response body is not valid JSON.\n"
                    ));
                };
                let actual = json_path::evaluate(document, path);
                (!matcher.matches(&actual)).then(|| {
                    format!(
                        "JSON path {path} doesn't match.\nExpected: {}\n  Actual: {}\n",
                        remove_quotes_if_string(&description),
                        display_actual(&actual)
                    )
                })
            }
        }
    }
}

fn display_actual(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(display_actual).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

impl fmt::Debug for ValidatableResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending: Vec<String> = self
            .expectations
            .iter()
            .map(|e| format!("{} {}", e.target, e.matcher.describe()))
            .collect();
        f.debug_struct("ValidatableResponse")
            .field("response", &self.response)
            .field("pending", &pending)
            .field("root_path", &self.root_path)
            .field("eager", &self.eager)
            .finish()
    }
}

impl Validatable for ValidatableResponse {
    fn extractable(&self) -> ExtractableResponse<'_> {
        ExtractableResponse::new(&self.response)
    }

    fn deferred_assertion(&mut self) -> Option<&mut dyn SupportsDeferredAssertion> {
        Some(self)
    }
}

impl SupportsDeferredAssertion for ValidatableResponse {
    fn disable_eager_assert(&mut self) {
        self.eager = false;
    }

    fn force_validate(&mut self) -> Result<(), AssertionFailure> {
        self.validate_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_type::ContentType;
    use crate::matcher::{contains_string, empty_or_null_string, equal_to, greater_than, has_item, not};
    use crate::response::ResponseBuilder;

    fn deferred(body: &str) -> ValidatableResponse {
        let response = ResponseBuilder::new()
            .content_type("application/json")
            .header("Set-Cookie", "session=abc")
            .body(body.to_string())
            .build()
            .unwrap();
        let mut validatable = ValidatableResponse::with_config(response, &AssayConfig::default());
        validatable.disable_eager_assert();
        validatable
    }

    #[test]
    fn test_no_expectations_is_a_no_op() {
        let mut validatable = deferred("{}");
        assert!(validatable.force_validate().is_ok());
        assert!(validatable.force_validate().is_ok());
    }

    #[test]
    fn test_three_failures_in_declaration_order() {
        let mut validatable = deferred(r#"{"message":"Hello World"}"#);
        validatable
            .status_code(400)
            .body("message", equal_to("Another World"))
            .body("message", equal_to("Brave new world"));

        let failure = validatable.force_validate().unwrap_err();
        assert_eq!(failure.count(), 3);
        assert_eq!(
            failure.to_string(),
            "3 expectations failed.\n\
             Expected status code <400> but was <200>.\n\
             \n\
             JSON path message doesn't match.\n\
             Expected: Another World\n  Actual: Hello World\n\
             \n\
             JSON path message doesn't match.\n\
             Expected: Brave new world\n  Actual: Hello World\n"
        );
    }

    #[test]
    fn test_missing_path_is_reported_as_null() {
        let mut validatable = deferred(r#"{"greeting":"Hello World"}"#);
        validatable
            .body("greeting", equal_to("Hello World"))
            .body("other", equal_to("thing"));

        let failure = validatable.force_validate().unwrap_err();
        assert_eq!(
            failure.failures(),
            ["JSON path other doesn't match.\nExpected: thing\n  Actual: null\n"]
        );
    }

    #[test]
    fn test_force_validate_drains_expectations() {
        let mut validatable = deferred("{}");
        validatable.status_code(500);
        assert_eq!(validatable.pending(), 1);
        assert!(validatable.force_validate().is_err());
        assert_eq!(validatable.pending(), 0);
        assert!(validatable.force_validate().is_ok());
    }

    #[test]
    fn test_header_content_type_and_cookie_messages() {
        let mut validatable = deferred("{}");
        validatable
            .header("X-Missing", "value")
            .content_type(ContentType::Html)
            .cookie("session", "other")
            .has_cookie("theme")
            .status_line(contains_string("Created"));

        let failure = validatable.force_validate().unwrap_err();
        let failures = failure.failures();
        assert_eq!(failures.len(), 5);
        assert!(failures[0].starts_with(
            "Expected header \"X-Missing\" was not \"value\", was \"null\". Headers are:\n"
        ));
        assert!(failures[0].contains("content-type=application/json"));
        assert_eq!(
            failures[1],
            "Expected content-type \"text/html\" doesn't match actual content-type \"application/json\".\n"
        );
        assert_eq!(
            failures[2],
            "Expected cookie \"session\" was not \"other\", was \"abc\".\n"
        );
        assert_eq!(
            failures[3],
            "Cookie \"theme\" was not defined in the response. Cookies are: \nsession=abc\n"
        );
        assert_eq!(
            failures[4],
            "Expected status line a string containing \"Created\" doesn't match actual status line \"HTTP/1.1 200 OK\".\n"
        );
    }

    #[test]
    fn test_passing_expectations() {
        let mut validatable = deferred(r#"{"greeting":"Hello World","lotto":{"winning":[2,45,34]}}"#);
        validatable
            .status_code(200)
            .status_code(greater_than(199))
            .content_type(ContentType::Json)
            .header("Content-Type", contains_string("json"))
            .cookie("session", "abc")
            .body("greeting", not(empty_or_null_string()))
            .body("lotto.winning", has_item(45))
            .body_matches(contains_string("Hello"));
        assert!(validatable.force_validate().is_ok());
    }

    #[test]
    fn test_root_path() {
        let mut validatable = deferred(r#"{"store":{"book":{"title":"Dune","author":"Herbert"}}}"#);
        validatable
            .root_path("store")
            .append_root_path("book")
            .body("title", "Dune")
            .no_root_path()
            .body("store.book.author", "Herbert");
        assert!(validatable.force_validate().is_ok());
    }

    #[test]
    fn test_root_path_from_config() {
        let response = ResponseBuilder::new()
            .body(r#"{"data":{"id":7}}"#)
            .build()
            .unwrap();
        let config = AssayConfig {
            root_path: "data".to_string(),
            ..AssayConfig::default()
        };
        let mut validatable = ValidatableResponse::with_config(response, &config);
        validatable.body("id", 7);
    }

    #[test]
    fn test_non_json_body_path_expectation() {
        let mut validatable = deferred("not json");
        validatable.body("a", equal_to(1));
        let failure = validatable.force_validate().unwrap_err();
        assert_eq!(
            failure.failures(),
            ["Cannot evaluate JSON path a: response body is not valid JSON.\n"]
        );
    }

    #[test]
    fn test_whole_body_message() {
        let mut validatable = deferred("{}");
        validatable.body_matches("[]");
        let failure = validatable.force_validate().unwrap_err();
        assert_eq!(
            failure.failures(),
            ["Response body doesn't match expectation.\nExpected: \"[]\"\n  Actual: {}\n"]
        );
    }

    #[test]
    fn test_actual_values_are_displayed_plainly() {
        let mut validatable = deferred(r#"{"n":5,"list":[1,"a"],"flag":true}"#);
        validatable
            .body("n", 6)
            .body("list", has_item(2))
            .body("flag", false);
        let failure = validatable.force_validate().unwrap_err();
        assert!(failure.failures()[0].ends_with("  Actual: 5\n"));
        assert!(failure.failures()[1].ends_with("  Actual: [1, a]\n"));
        assert!(failure.failures()[2].ends_with("  Actual: true\n"));
    }

    #[test]
    fn test_large_integer_mismatches_are_reported() {
        let mut validatable = deferred(r#"{"id":9007199254740992,"ids":[9007199254740992]}"#);
        validatable
            .body("id", equal_to(9_007_199_254_740_993_u64))
            .body("ids", has_item(9_007_199_254_740_993_u64))
            .body("id", greater_than(9_007_199_254_740_992_u64))
            .body("id", equal_to(9_007_199_254_740_992_u64));

        let failure = validatable.force_validate().unwrap_err();
        assert_eq!(failure.count(), 3);
        assert_eq!(
            failure.failures()[0],
            "JSON path id doesn't match.\nExpected: <9007199254740993>\n  Actual: 9007199254740992\n"
        );
    }

    #[test]
    #[should_panic(expected = "1 expectation failed.\nExpected status code <404> but was <200>.\n")]
    fn test_eager_mode_panics_on_registration() {
        let response = ResponseBuilder::new().build().unwrap();
        let mut validatable = ValidatableResponse::with_config(response, &AssayConfig::default());
        validatable.status_code(404);
    }

    #[test]
    fn test_eager_mode_passes_silently() {
        let response = ResponseBuilder::new().build().unwrap();
        let mut validatable = ValidatableResponse::with_config(response, &AssayConfig::default());
        validatable.status_code(200);
        assert_eq!(validatable.pending(), 0);
    }
}
