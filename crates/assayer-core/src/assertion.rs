//! Aggregated assertion failures.

use std::fmt;

/// The single failure raised when one or more expectations do not hold.
///
/// Each entry is an independently formatted mismatch description ending in a
/// newline. The display form is a count header followed by the entries,
/// separated by blank lines, in the order the expectations were declared:
///
/// ```text
/// 2 expectations failed.
/// Expected status code <400> but was <200>.
///
/// JSON path message doesn't match.
/// Expected: Another World
///   Actual: Hello World
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    failures: Vec<String>,
}

impl AssertionFailure {
    /// Creates a failure from mismatch descriptions in declaration order.
    #[must_use]
    pub fn new(failures: Vec<String>) -> Self {
        Self { failures }
    }

    /// Number of failed expectations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.failures.len()
    }

    /// The individual mismatch descriptions.
    #[must_use]
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.failures.len() == 1 {
            "expectation"
        } else {
            "expectations"
        };
        write!(f, "{} {noun} failed.\n{}", self.failures.len(), self.failures.join("\n"))
    }
}

impl std::error::Error for AssertionFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_failure_uses_singular() {
        let failure = AssertionFailure::new(vec!["boom.\n".to_string()]);
        assert_eq!(failure.to_string(), "1 expectation failed.\nboom.\n");
    }

    #[test]
    fn test_failures_are_separated_by_blank_lines() {
        let failure = AssertionFailure::new(vec!["first.\n".to_string(), "second.\n".to_string()]);
        assert_eq!(failure.count(), 2);
        assert_eq!(failure.to_string(), "2 expectations failed.\nfirst.\n\nsecond.\n");
    }
}
