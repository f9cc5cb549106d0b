#![forbid(unsafe_code)]

//! Error taxonomy shared by the builder, the merger, and the registry.

use std::fmt;

use crate::path::NodePath;

/// Errors raised while classifying, merging, or rendering.
///
/// Only [`InvalidInput`](KnobError::InvalidInput) is ever returned to a
/// caller as a failure. Shape mismatches are collected as diagnostics by
/// [`merge_report`](crate::merge_report) and the registry degrades to a no-op
/// when it reports [`RegistryUnavailable`](KnobError::RegistryUnavailable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnobError {
    /// A value has no control kind (`null`, a bare computed number, or a
    /// non-object root).
    InvalidInput {
        /// Where the value sits in the input tree.
        path: NodePath,
        /// Type name of the offending value.
        found: &'static str,
    },
    /// A plain value does not fit the node at its path.
    ShapeMismatch {
        /// Where the mismatch happened.
        path: NodePath,
        /// What the node tree expects there.
        expected: &'static str,
        /// Type name of the supplied value.
        found: &'static str,
    },
    /// No rendering surface can exist in this environment.
    RegistryUnavailable,
}

impl KnobError {
    /// Path the error refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            Self::InvalidInput { path, .. } | Self::ShapeMismatch { path, .. } => Some(path),
            Self::RegistryUnavailable => None,
        }
    }

    /// Re-anchor a path-relative error under `prefix`.
    #[must_use]
    pub fn within(self, prefix: &NodePath) -> Self {
        match self {
            Self::InvalidInput { path, found } => Self::InvalidInput {
                path: path.prefixed(prefix),
                found,
            },
            Self::ShapeMismatch {
                path,
                expected,
                found,
            } => Self::ShapeMismatch {
                path: path.prefixed(prefix),
                expected,
                found,
            },
            Self::RegistryUnavailable => Self::RegistryUnavailable,
        }
    }
}

impl fmt::Display for KnobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { path, found } => {
                write!(f, "invalid input at {path}: {found} has no control kind")
            }
            Self::ShapeMismatch {
                path,
                expected,
                found,
            } => write!(
                f,
                "shape mismatch at {path}: expected {expected}, found {found}"
            ),
            Self::RegistryUnavailable => f.write_str("no rendering surface is available"),
        }
    }
}

impl std::error::Error for KnobError {}

/// Result alias for fallible knob operations.
pub type Result<T> = std::result::Result<T, KnobError>;
