//! JSON path evaluation.
//!
//! Paths are dotted, GPath flavoured expressions evaluated against a parsed
//! response body:
//!
//! - `user.name`: object member access
//! - `items[0]`, `items.0`, `items[-1]`: array indexing (negative from the end)
//! - `items.name`: member access on an array collects that member from every element
//! - `items.size()`: length of an array, object or string
//! - `""` or `$`: the whole document
//!
//! Paths that lead nowhere evaluate to `null`, never to an error.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AssayError, AssayResult};

/// A parsed JSON document that values can be read from by path.
///
/// # Example
///
/// ```
/// use assayer_core::JsonPath;
///
/// let json = JsonPath::parse(r#"{"lotto":{"winners":[{"id":23},{"id":54}]}}"#).unwrap();
/// let ids: Vec<u32> = json.get("lotto.winners.id").unwrap();
/// assert_eq!(ids, vec![23, 54]);
/// assert_eq!(json.get::<usize>("lotto.winners.size()").unwrap(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    root: Value,
}

impl JsonPath {
    /// Wraps an already parsed document.
    #[must_use]
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Parses a document from text.
    pub fn parse(text: &str) -> AssayResult<Self> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    /// Parses a document from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> AssayResult<Self> {
        Ok(Self::new(serde_json::from_slice(bytes)?))
    }

    /// The whole document.
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Evaluates `path`, returning `null` when nothing is found.
    #[must_use]
    pub fn get_value(&self, path: &str) -> Value {
        evaluate(&self.root, path)
    }

    /// Evaluates `path` and converts the result to `T`.
    ///
    /// Use `Option<T>` to accept missing values.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> AssayResult<T> {
        serde_json::from_value(self.get_value(path)).map_err(|source| AssayError::Extraction {
            path: path.to_string(),
            source,
        })
    }

    /// Evaluates `path` as a list of `T`. A missing path yields an empty list.
    pub fn get_list<T: DeserializeOwned>(&self, path: &str) -> AssayResult<Vec<T>> {
        match self.get_value(path) {
            Value::Null => Ok(Vec::new()),
            Value::Array(_) => self.get(path),
            single => {
                let item = serde_json::from_value(single).map_err(|source| {
                    AssayError::Extraction {
                        path: path.to_string(),
                        source,
                    }
                })?;
                Ok(vec![item])
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Member(String),
    Index(i64),
    Size,
}

fn parse_path(path: &str) -> Vec<Step> {
    let path = path.trim();
    let path = path.strip_prefix('$').unwrap_or(path);
    let mut steps = Vec::new();

    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        if segment == "size()" {
            steps.push(Step::Size);
            continue;
        }

        let (name, mut rest) = match segment.find('[') {
            Some(pos) => (&segment[..pos], &segment[pos..]),
            None => (segment, ""),
        };

        if !name.is_empty() {
            match name.parse::<i64>() {
                Ok(index) => steps.push(Step::Index(index)),
                Err(_) => steps.push(Step::Member(name.to_string())),
            }
        }

        // Trailing `[n]` selectors, e.g. `matrix[0][1]`
        while let Some(open) = rest.strip_prefix('[') {
            let Some(close) = open.find(']') else {
                steps.push(Step::Member(rest.to_string()));
                break;
            };
            let inner = open[..close].trim();
            match inner.parse::<i64>() {
                Ok(index) => steps.push(Step::Index(index)),
                Err(_) => steps.push(Step::Member(inner.trim_matches(['\'', '"']).to_string())),
            }
            rest = &open[close + 1..];
        }
    }

    steps
}

fn index_into(items: &[Value], index: i64) -> Value {
    let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
    let resolved = if index < 0 { len + index } else { index };
    usize::try_from(resolved)
        .ok()
        .and_then(|i| items.get(i))
        .cloned()
        .unwrap_or(Value::Null)
}

fn apply(current: &Value, step: &Step) -> Value {
    match (step, current) {
        (Step::Size, Value::Array(items)) => Value::from(items.len()),
        (Step::Size, Value::Object(map)) => Value::from(map.len()),
        (Step::Size, Value::String(s)) => Value::from(s.chars().count()),
        (Step::Index(index), Value::Array(items)) => index_into(items, *index),
        (Step::Index(index), Value::Object(map)) => {
            map.get(&index.to_string()).cloned().unwrap_or(Value::Null)
        }
        (Step::Member(name), Value::Object(map)) => map.get(name).cloned().unwrap_or(Value::Null),
        (Step::Member(_), Value::Array(items)) => {
            Value::Array(items.iter().map(|item| apply(item, step)).collect())
        }
        _ => Value::Null,
    }
}

/// Evaluates `path` against `value`.
#[must_use]
pub fn evaluate(value: &Value, path: &str) -> Value {
    parse_path(path)
        .iter()
        .fold(value.clone(), |current, step| apply(&current, step))
}

/// Joins a root path and a path the way validation expectations combine them.
#[must_use]
pub fn join_paths(root: &str, path: &str) -> String {
    match (root.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => root.to_string(),
        (false, false) if path.starts_with('[') => format!("{root}{path}"),
        (false, false) => format!("{root}.{path}"),
    }
}
