#![forbid(unsafe_code)]

//! Key paths addressing nodes inside a tree.

use std::fmt;

/// Sequence of keys from the root folder down to a node.
///
/// The empty path addresses the root itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<String>);

impl NodePath {
    /// The root path.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Whether this addresses the root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this path has no keys (same as [`is_root`](Self::is_root)).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys from the root down.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.0
    }

    /// Last key, if any.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// A new path one level deeper.
    #[must_use]
    pub fn child(&self, key: &str) -> Self {
        let mut keys = self.0.clone();
        keys.push(key.to_owned());
        Self(keys)
    }

    /// Descend in place.
    pub fn push(&mut self, key: &str) {
        self.0.push(key.to_owned());
    }

    /// Ascend in place.
    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    /// `prefix` followed by this path.
    #[must_use]
    pub fn prefixed(&self, prefix: &Self) -> Self {
        let mut keys = prefix.0.clone();
        keys.extend(self.0.iter().cloned());
        Self(keys)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.0.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for NodePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for NodePath {
    /// Parse a dotted path (`"camera.position"`). The empty string is the root.
    fn from(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::root();
        }
        dotted.split('.').collect()
    }
}
