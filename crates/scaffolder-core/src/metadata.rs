//! Metadata shared by the pipeline stages and the file collection they work on

use serde_json::Value;
use std::collections::BTreeMap;

/// Key/value state accumulated from the environment and from user answers.
/// Values are strings, booleans, numbers, or mappings for multi-select answers.
pub type Metadata = serde_json::Map<String, Value>;

/// Resolve a dotted key path (`features.router`) against metadata
pub fn lookup<'a>(metadata: &'a Metadata, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(metadata.get(first)?, |value, segment| value.get(segment.as_str()))
}

/// Truthiness in the template sense: null, false, 0, NaN and "" are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Relative output path to byte content.
///
/// Entries can be removed or have their content replaced, but the pipeline
/// never adds a path; new entries only come from the initial collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCollection {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }

    /// Replace the content of an existing entry. Returns false (and changes
    /// nothing) when `path` is not in the collection.
    pub fn replace(&mut self, path: &str, content: Vec<u8>) -> bool {
        match self.files.get_mut(path) {
            Some(slot) => {
                *slot = content;
                true
            }
            None => false,
        }
    }
}

impl<P: Into<String>, C: Into<Vec<u8>>> FromIterator<(P, C)> for FileCollection {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        Self {
            files: iter
                .into_iter()
                .map(|(path, content)| (path.into(), content.into()))
                .collect(),
        }
    }
}
