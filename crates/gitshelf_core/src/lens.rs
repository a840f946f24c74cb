//! Content path: where a collection lives inside its decoded file.
//!
//! A content path is a get/set pair over nested mappings. `Pokedex` addresses
//! the `Pokedex` key of the root mapping, `data.items` addresses `items` inside
//! `data`. The empty path addresses the whole document.

use serde_yaml_ng::{Mapping, Value};

/// A dotted path of mapping keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPath {
    segments: Vec<String>,
}

impl ContentPath {
    /// Parse a dotted path. Empty segments are ignored, so `""` is the root.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Build a path from explicit segments (keys that may contain dots).
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this path addresses the whole document.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Extract the value at this path. Missing keys and non-mapping
    /// intermediates yield `Null`.
    pub fn get(&self, document: Value) -> Value {
        let mut current = document;
        for segment in &self.segments {
            current = match current {
                Value::Mapping(mut map) => map.remove(segment.as_str()).unwrap_or(Value::Null),
                _ => return Value::Null,
            };
        }
        current
    }

    /// Wrap `contents` in the minimal nested mappings that place it at this path.
    pub fn wrap(&self, contents: Value) -> Value {
        self.segments.iter().rev().fold(contents, |inner, segment| {
            let mut map = Mapping::new();
            map.insert(Value::String(segment.clone()), inner);
            Value::Mapping(map)
        })
    }
}

impl From<&str> for ContentPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for ContentPath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl std::fmt::Display for ContentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
