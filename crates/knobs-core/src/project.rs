#![forbid(unsafe_code)]

//! Projections between a control tree and its plain values.
//!
//! [`extract`] strips a tree down to bare values; [`merge`] writes plain
//! values back into a tree. Both are pure: `merge` returns a fresh tree and
//! never changes its shape.
//!
//! # Mismatch policy
//!
//! Merging is permissive. A key with no node, a non-object where a folder
//! sits, or a value of the wrong primitive type for a leaf is skipped and the
//! existing node kept. [`merge_report`] returns the skipped paths as
//! [`KnobError::ShapeMismatch`] diagnostics.

use crate::error::KnobError;
use crate::logging::debug;
use crate::node::{Folder, Node};
use crate::path::NodePath;
use crate::value::{Map, Value};

/// Plain values of `node`: folders become objects, leaves their bare value.
#[must_use]
pub fn extract(node: &Node) -> Value {
    match node {
        Node::Folder(folder) => Value::Object(
            folder
                .children
                .iter()
                .map(|(key, child)| (key, extract(child)))
                .collect(),
        ),
        leaf => leaf.leaf_value().unwrap_or(Value::Null),
    }
}

/// Merge `values` into a copy of `node`.
#[must_use]
pub fn merge(node: &Node, values: &Value) -> Node {
    merge_report(node, values).0
}

/// Merge `values` into a copy of `node` and report what was skipped.
#[must_use]
pub fn merge_report(node: &Node, values: &Value) -> (Node, MergeReport) {
    let mut report = MergeReport::default();
    let mut path = NodePath::root();
    let merged = merge_node(node, values, &mut path, &mut report);
    (merged, report)
}

fn merge_node(node: &Node, values: &Value, path: &mut NodePath, report: &mut MergeReport) -> Node {
    let Node::Folder(folder) = node else {
        return match node.with_value(values) {
            Some(next) => next,
            None => {
                report.skip(path.clone(), node.expected_type(), values.type_name());
                node.clone()
            }
        };
    };

    let Value::Object(entries) = values else {
        report.skip(path.clone(), "object", values.type_name());
        return node.clone();
    };

    let mut children = Map::with_capacity(folder.children.len());
    for (key, child) in folder.children.iter() {
        let merged = match entries.get(key) {
            Some(value) => {
                path.push(key);
                let merged = merge_node(child, value, path, report);
                path.pop();
                merged
            }
            None => child.clone(),
        };
        children.insert(key, merged);
    }

    for (key, value) in entries.iter() {
        if !folder.children.contains_key(key) {
            report.skip(path.child(key), "no value", value.type_name());
        }
    }

    Node::Folder(Folder {
        children,
        meta: folder.meta.clone(),
    })
}

/// Diagnostics collected by [`merge_report`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    skipped: Vec<KnobError>,
}

impl MergeReport {
    fn skip(&mut self, path: NodePath, expected: &'static str, found: &'static str) {
        debug!(path = %path, expected, found, "merge skipped mismatched value");
        self.skipped.push(KnobError::ShapeMismatch {
            path,
            expected,
            found,
        });
    }

    /// Whether every supplied value landed on a node.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Skipped values as [`KnobError::ShapeMismatch`] entries, in visit order.
    #[must_use]
    pub fn skipped(&self) -> &[KnobError] {
        &self.skipped
    }
}
