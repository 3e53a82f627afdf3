//! Hamcrest-style matchers.
//!
//! A [`Matcher`] is a predicate over a [`serde_json::Value`] together with a
//! human readable description. Every expectation registered on a
//! [`ValidatableResponse`](crate::ValidatableResponse) pairs a part of the
//! response (status, header, JSON path, ...) with a matcher. The descriptions
//! follow Hamcrest wording so failure messages read the same way users of the
//! JVM tooling expect:
//!
//! ```
//! use assayer_core::matcher::{equal_to, not, empty_or_null_string, Matcher};
//!
//! assert_eq!(equal_to("Hello").describe(), "\"Hello\"");
//! assert_eq!(equal_to(400).describe(), "<400>");
//! assert_eq!(not(empty_or_null_string()).describe(), "not (null or an empty string)");
//! ```

use regex::Regex;
use serde_json::Value;

/// A predicate over response values with a description used in failure messages.
pub trait Matcher {
    /// Returns `true` if `actual` satisfies this matcher.
    fn matches(&self, actual: &Value) -> bool;

    /// Describes what this matcher expects.
    fn describe(&self) -> String;
}

impl<M: Matcher + ?Sized> Matcher for Box<M> {
    fn matches(&self, actual: &Value) -> bool {
        (**self).matches(actual)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Boxed matcher stored by pending expectations.
pub type BoxMatcher = Box<dyn Matcher>;

/// Conversion into a boxed matcher.
///
/// Implemented for every [`Matcher`] and for plain values, which become
/// [`equal_to`] matchers. This lets `status_code(200)` and
/// `status_code(greater_than(199))` share one method.
pub trait IntoMatcher {
    /// Converts `self` into a boxed matcher.
    fn into_matcher(self) -> BoxMatcher;
}

impl<M: Matcher + 'static> IntoMatcher for M {
    fn into_matcher(self) -> BoxMatcher {
        Box::new(self)
    }
}

macro_rules! value_into_matcher {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoMatcher for $ty {
                fn into_matcher(self) -> BoxMatcher {
                    Box::new(equal_to(self))
                }
            }
        )*
    };
}

value_into_matcher!(i32, i64, u16, u32, u64, f64, bool, &str, String, Value);

/// Formats a value the way Hamcrest's `appendValue` does.
///
/// Strings are quoted, `null` is bare and everything else is wrapped in angle
/// brackets.
#[must_use]
pub fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => format!("\"{s}\""),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(plain_value).collect();
            format!("<[{}]>", inner.join(", "))
        }
        other => format!("<{other}>"),
    }
}

/// Strips the quotes Hamcrest puts around string descriptions.
#[must_use]
pub fn remove_quotes_if_string(description: &str) -> String {
    if description.len() >= 2 && description.starts_with('"') && description.ends_with('"') {
        description[1..description.len() - 1].to_string()
    } else {
        description.to_string()
    }
}

fn plain_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Orders two JSON numbers. Integers compare exactly; `f64` is used only when
/// either side is a float.
fn compare_numbers(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    let (Value::Number(left), Value::Number(right)) = (left, right) else {
        return None;
    };
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        return Some(l.cmp(&r));
    }
    if let (Some(l), Some(r)) = (left.as_u64(), right.as_u64()) {
        return Some(l.cmp(&r));
    }
    // One side is a negative i64 and the other a u64 above i64::MAX.
    if left.as_i64().is_some() && right.as_u64().is_some() {
        return Some(std::cmp::Ordering::Less);
    }
    if left.as_u64().is_some() && right.as_i64().is_some() {
        return Some(std::cmp::Ordering::Greater);
    }
    left.as_f64()?.partial_cmp(&right.as_f64()?)
}

/// Matches values equal to the expected one. Numbers compare by value, so
/// `200` equals `200.0`.
#[derive(Debug, Clone)]
pub struct EqualTo {
    expected: Value,
}

impl Matcher for EqualTo {
    fn matches(&self, actual: &Value) -> bool {
        match compare_numbers(&self.expected, actual) {
            Some(order) => order.is_eq(),
            None => &self.expected == actual,
        }
    }

    fn describe(&self) -> String {
        describe_value(&self.expected)
    }
}

/// Creates a matcher for values equal to `expected`.
pub fn equal_to(expected: impl Into<Value>) -> EqualTo {
    EqualTo {
        expected: expected.into(),
    }
}

/// Inverts another matcher.
pub struct Not {
    inner: BoxMatcher,
}

impl Matcher for Not {
    fn matches(&self, actual: &Value) -> bool {
        !self.inner.matches(actual)
    }

    fn describe(&self) -> String {
        format!("not {}", self.inner.describe())
    }
}

/// Creates a matcher that succeeds when `matcher` fails.
pub fn not(matcher: impl IntoMatcher) -> Not {
    Not {
        inner: matcher.into_matcher(),
    }
}

/// Matches anything.
#[derive(Debug, Clone, Copy)]
pub struct Anything;

impl Matcher for Anything {
    fn matches(&self, _actual: &Value) -> bool {
        true
    }

    fn describe(&self) -> String {
        "ANYTHING".to_string()
    }
}

/// Creates a matcher that always succeeds.
pub fn anything() -> Anything {
    Anything
}

/// Matches `null` (or an absent path).
#[derive(Debug, Clone, Copy)]
pub struct NullValue {
    negate: bool,
}

impl Matcher for NullValue {
    fn matches(&self, actual: &Value) -> bool {
        actual.is_null() != self.negate
    }

    fn describe(&self) -> String {
        if self.negate {
            "not null".to_string()
        } else {
            "null".to_string()
        }
    }
}

/// Creates a matcher for `null` values.
pub fn null_value() -> NullValue {
    NullValue { negate: false }
}

/// Creates a matcher for anything but `null`.
pub fn not_null_value() -> NullValue {
    NullValue { negate: true }
}

/// Matches `null` or the empty string.
#[derive(Debug, Clone, Copy)]
pub struct EmptyOrNullString;

impl Matcher for EmptyOrNullString {
    fn matches(&self, actual: &Value) -> bool {
        match actual {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    fn describe(&self) -> String {
        "(null or an empty string)".to_string()
    }
}

/// Creates a matcher for `null` or `""`.
pub fn empty_or_null_string() -> EmptyOrNullString {
    EmptyOrNullString
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringOp {
    Contains,
    StartsWith,
    EndsWith,
}

/// Substring matchers over string values.
#[derive(Debug, Clone)]
pub struct StringMatcher {
    op: StringOp,
    expected: String,
}

impl Matcher for StringMatcher {
    fn matches(&self, actual: &Value) -> bool {
        let Some(actual) = actual.as_str() else {
            return false;
        };
        match self.op {
            StringOp::Contains => actual.contains(&self.expected),
            StringOp::StartsWith => actual.starts_with(&self.expected),
            StringOp::EndsWith => actual.ends_with(&self.expected),
        }
    }

    fn describe(&self) -> String {
        let verb = match self.op {
            StringOp::Contains => "containing",
            StringOp::StartsWith => "starting with",
            StringOp::EndsWith => "ending with",
        };
        format!("a string {verb} \"{}\"", self.expected)
    }
}

/// Creates a matcher for strings containing `expected`.
pub fn contains_string(expected: impl Into<String>) -> StringMatcher {
    StringMatcher {
        op: StringOp::Contains,
        expected: expected.into(),
    }
}

/// Creates a matcher for strings starting with `prefix`.
pub fn starts_with(prefix: impl Into<String>) -> StringMatcher {
    StringMatcher {
        op: StringOp::StartsWith,
        expected: prefix.into(),
    }
}

/// Creates a matcher for strings ending with `suffix`.
pub fn ends_with(suffix: impl Into<String>) -> StringMatcher {
    StringMatcher {
        op: StringOp::EndsWith,
        expected: suffix.into(),
    }
}

/// Matches strings against a regular expression.
#[derive(Debug, Clone)]
pub struct MatchesPattern {
    pattern: Regex,
}

impl Matcher for MatchesPattern {
    fn matches(&self, actual: &Value) -> bool {
        actual.as_str().is_some_and(|s| self.pattern.is_match(s))
    }

    fn describe(&self) -> String {
        format!("a string matching the pattern \"{}\"", self.pattern.as_str())
    }
}

/// Creates a matcher for strings matching `pattern`.
pub fn matches_pattern(pattern: Regex) -> MatchesPattern {
    MatchesPattern { pattern }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ordering {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

/// Numeric comparison against a bound.
#[derive(Debug, Clone)]
pub struct OrderingMatcher {
    op: Ordering,
    bound: Value,
}

impl Matcher for OrderingMatcher {
    fn matches(&self, actual: &Value) -> bool {
        let Some(order) = compare_numbers(actual, &self.bound) else {
            return false;
        };
        match self.op {
            Ordering::Greater => order.is_gt(),
            Ordering::GreaterOrEqual => order.is_ge(),
            Ordering::Less => order.is_lt(),
            Ordering::LessOrEqual => order.is_le(),
        }
    }

    fn describe(&self) -> String {
        let relation = match self.op {
            Ordering::Greater => "greater than",
            Ordering::GreaterOrEqual => "equal to or greater than",
            Ordering::Less => "less than",
            Ordering::LessOrEqual => "less than or equal to",
        };
        format!("a value {relation} {}", describe_value(&self.bound))
    }
}

fn ordering(op: Ordering, bound: impl Into<Value>) -> OrderingMatcher {
    OrderingMatcher {
        op,
        bound: bound.into(),
    }
}

/// Creates a matcher for numbers greater than `bound`.
pub fn greater_than(bound: impl Into<Value>) -> OrderingMatcher {
    ordering(Ordering::Greater, bound)
}

/// Creates a matcher for numbers greater than or equal to `bound`.
pub fn greater_than_or_equal_to(bound: impl Into<Value>) -> OrderingMatcher {
    ordering(Ordering::GreaterOrEqual, bound)
}

/// Creates a matcher for numbers less than `bound`.
pub fn less_than(bound: impl Into<Value>) -> OrderingMatcher {
    ordering(Ordering::Less, bound)
}

/// Creates a matcher for numbers less than or equal to `bound`.
pub fn less_than_or_equal_to(bound: impl Into<Value>) -> OrderingMatcher {
    ordering(Ordering::LessOrEqual, bound)
}

/// Matches arrays with at least one element satisfying the inner matcher.
pub struct HasItem {
    inner: BoxMatcher,
}

impl Matcher for HasItem {
    fn matches(&self, actual: &Value) -> bool {
        actual
            .as_array()
            .is_some_and(|items| items.iter().any(|item| self.inner.matches(item)))
    }

    fn describe(&self) -> String {
        format!("a collection containing {}", self.inner.describe())
    }
}

/// Creates a matcher for collections containing an item matching `item`.
pub fn has_item(item: impl IntoMatcher) -> HasItem {
    HasItem {
        inner: item.into_matcher(),
    }
}

/// Matches arrays, objects or strings of a given size.
#[derive(Debug, Clone, Copy)]
pub struct HasSize {
    size: usize,
}

impl Matcher for HasSize {
    fn matches(&self, actual: &Value) -> bool {
        match actual {
            Value::Array(items) => items.len() == self.size,
            Value::Object(map) => map.len() == self.size,
            Value::String(s) => s.chars().count() == self.size,
            _ => false,
        }
    }

    fn describe(&self) -> String {
        format!("a collection with size <{}>", self.size)
    }
}

/// Creates a matcher for collections of exactly `size` elements.
pub fn has_size(size: usize) -> HasSize {
    HasSize { size }
}

/// Matches objects containing a key.
#[derive(Debug, Clone)]
pub struct HasKey {
    key: String,
}

impl Matcher for HasKey {
    fn matches(&self, actual: &Value) -> bool {
        actual
            .as_object()
            .is_some_and(|map| map.contains_key(&self.key))
    }

    fn describe(&self) -> String {
        format!("map containing [\"{}\"->ANYTHING]", self.key)
    }
}

/// Creates a matcher for objects with the given key.
pub fn has_key(key: impl Into<String>) -> HasKey {
    HasKey { key: key.into() }
}

/// Combines matchers with logical `or` / `and`.
pub struct Combined {
    any: bool,
    matchers: Vec<BoxMatcher>,
}

impl Matcher for Combined {
    fn matches(&self, actual: &Value) -> bool {
        if self.any {
            self.matchers.iter().any(|m| m.matches(actual))
        } else {
            self.matchers.iter().all(|m| m.matches(actual))
        }
    }

    fn describe(&self) -> String {
        let joiner = if self.any { " or " } else { " and " };
        let parts: Vec<String> = self.matchers.iter().map(|m| m.describe()).collect();
        format!("({})", parts.join(joiner))
    }
}

/// Creates a matcher that succeeds when any of `matchers` does.
pub fn any_of(matchers: Vec<BoxMatcher>) -> Combined {
    Combined {
        any: true,
        matchers,
    }
}

/// Creates a matcher that succeeds when all of `matchers` do.
pub fn all_of(matchers: Vec<BoxMatcher>) -> Combined {
    Combined {
        any: false,
        matchers,
    }
}
