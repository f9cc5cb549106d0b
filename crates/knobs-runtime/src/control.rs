#![forbid(unsafe_code)]

//! Headless control bindings.
//!
//! A rendering surface shows one control per leaf of each node store it is
//! given. [`controls`] enumerates those leaves as [`ControlBinding`]s; each
//! binding reads a [`ControlState`] snapshot for drawing and writes user
//! edits back into the store, which drives the session's internal-to-external
//! sync.
//!
//! Computed bounds are evaluated here, at read time, never by the core.

use knobs_core::{Bound, Node, NodeKind, NodePath, Value};
use tracing::trace;

use crate::session::NodeStore;

/// Meta keys consulted for display labels, in priority order.
const LABEL_KEYS: [&str; 2] = ["$label", "$title"];

/// What a control needs to draw itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    /// Control kind.
    pub kind: NodeKind,
    /// Current value.
    pub value: Value,
    /// Lower bound, present only when both bounds are.
    pub min: Option<f64>,
    /// Upper bound, present only when both bounds are.
    pub max: Option<f64>,
    /// Increment.
    pub step: Option<f64>,
    /// Display label: `$label`, then `$title`, then the key.
    pub label: String,
}

/// One leaf of a node store, bound for reading and writing.
#[derive(Debug, Clone)]
pub struct ControlBinding {
    store: NodeStore,
    path: NodePath,
}

/// Bindings for every leaf of `store`, depth-first in key order.
#[must_use]
pub fn controls(store: &NodeStore) -> Vec<ControlBinding> {
    store.with(|tree| {
        tree.leaves()
            .into_iter()
            .map(|(path, _)| ControlBinding {
                store: store.clone(),
                path,
            })
            .collect()
    })
}

impl ControlBinding {
    /// Bind the leaf at `path`. Returns `None` if it is missing or a folder.
    #[must_use]
    pub fn new(store: &NodeStore, path: NodePath) -> Option<Self> {
        let is_leaf = store.with(|tree| tree.get(&path).is_some_and(|n| !n.is_folder()));
        is_leaf.then(|| Self {
            store: store.clone(),
            path,
        })
    }

    /// Path of the bound leaf.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Labels of the enclosing folders, outermost first.
    #[must_use]
    pub fn sections(&self) -> Vec<String> {
        self.store.with(|tree| {
            let mut out = Vec::new();
            let mut node = tree;
            let keys = self.path.keys();
            for key in keys.iter().take(keys.len().saturating_sub(1)) {
                let Some(child) = node.child(key) else {
                    break;
                };
                out.push(label_of(child, key));
                node = child;
            }
            out
        })
    }

    /// Snapshot for drawing. Evaluates computed bounds.
    #[must_use]
    pub fn state(&self) -> Option<ControlState> {
        let (kind, value, label, bounds) = self.store.with(|tree| {
            let node = tree.get(&self.path)?;
            let key = self.path.last().unwrap_or_default();
            let bounds = node
                .as_number()
                .map(|n| (n.min.clone(), n.max.clone(), n.step.clone()));
            Some((node.kind(), node.leaf_value()?, label_of(node, key), bounds))
        })?;

        // Bounds are resolved after the borrow ends so computed closures may
        // read the store.
        let (min, max, step) = match bounds {
            Some((Some(min), Some(max), step)) => (
                Some(min.resolve()),
                Some(max.resolve()),
                step.as_ref().map(Bound::resolve),
            ),
            Some((_, _, step)) => (None, None, step.as_ref().map(Bound::resolve)),
            None => (None, None, None),
        };

        Some(ControlState {
            kind,
            value,
            min,
            max,
            step,
            label,
        })
    }

    /// Write a new value into the store. Returns `false` (and publishes
    /// nothing) when the leaf cannot hold `value`.
    pub fn write(&self, value: &Value) -> bool {
        let mut tree = self.store.get();
        if !tree.set_leaf_value(&self.path, value) {
            trace!(path = %self.path, found = value.type_name(), "control write rejected");
            return false;
        }
        self.store.set(tree);
        true
    }

    /// Invoke a button's action. Returns whether the leaf was a button.
    pub fn press(&self) -> bool {
        let action = self.store.with(|tree| match tree.get(&self.path) {
            Some(Node::Button(leaf)) => Some(leaf.value.clone()),
            _ => None,
        });
        match action {
            Some(action) => {
                action.call();
                true
            }
            None => false,
        }
    }
}

fn label_of(node: &Node, key: &str) -> String {
    LABEL_KEYS
        .iter()
        .find_map(|k| node.meta().get(k).and_then(Value::as_str))
        .unwrap_or(key)
        .to_owned()
}
