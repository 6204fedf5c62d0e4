use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A dotted path (e.g. `settings.rememberMe`) addressing a field within a
/// document, relative to the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Whether this path addresses the document root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// A new path with `name` appended.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_owned());
        Self(segments)
    }

    /// `other` appended to this path.
    pub fn join(&self, other: &FieldPath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// The segments of this path, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Split into the parent path and the final segment.
    pub fn split_last(&self) -> Option<(&[String], &str)> {
        self.0
            .split_last()
            .map(|(last, parent)| (parent, last.as_str()))
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        Self(
            value
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }
}

impl From<String> for FieldPath {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}
