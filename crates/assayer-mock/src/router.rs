//! Path-template routing for mock applications.
//!
//! Patterns are `/`-separated segments where `{name}` captures one segment:
//!
//! ```
//! use assayer_mock::PathPattern;
//!
//! let pattern = PathPattern::parse("/users/{id}/posts");
//! let params = pattern.match_path("/users/42/posts").unwrap();
//! assert_eq!(params.get("id").map(String::as_str), Some("42"));
//! assert!(pattern.match_path("/users/42").is_none());
//! ```

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

/// A parsed route pattern such as `/users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<PathSegment>,
    pattern: String,
}

impl PathPattern {
    /// Parses `pattern`. Empty segments are ignored.
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => PathSegment::Param(name.to_string()),
                None => PathSegment::Literal(s.to_string()),
            })
            .collect();

        Self {
            segments,
            pattern: pattern.to_string(),
        }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Matches `path`, returning captured parameters (percent-decoded).
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (pattern, actual) in self.segments.iter().zip(&path_segments) {
            match pattern {
                PathSegment::Literal(expected) => {
                    if expected != actual {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    let value = urlencoding::decode(actual)
                        .map_or_else(|_| (*actual).to_string(), |v| v.into_owned());
                    params.insert(name.clone(), value);
                }
            }
        }

        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let pattern = PathPattern::parse("/greeting");
        assert_eq!(pattern.match_path("/greeting"), Some(HashMap::new()));
        assert_eq!(pattern.match_path("/greeting/"), Some(HashMap::new()));
        assert!(pattern.match_path("/greetings").is_none());
    }

    #[test]
    fn test_multiple_params() {
        let pattern = PathPattern::parse("/users/{userId}/orders/{orderId}");
        let params = pattern.match_path("/users/u1/orders/o%202").unwrap();
        assert_eq!(params["userId"], "u1");
        assert_eq!(params["orderId"], "o 2");
    }

    #[test]
    fn test_root() {
        let pattern = PathPattern::parse("/");
        assert!(pattern.match_path("/").is_some());
        assert!(pattern.match_path("/x").is_none());
        assert_eq!(pattern.as_str(), "/");
    }
}
