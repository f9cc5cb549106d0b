#![forbid(unsafe_code)]

//! Classified control nodes.
//!
//! # Design
//!
//! A [`Node`] is one entry of the control tree: either a leaf holding the
//! current value of a single control, or a [`Folder`] grouping child nodes.
//! Every node carries a [`Meta`] map holding the `$`-prefixed keys of its
//! source literal verbatim (display titles, collapsed flags, ...).
//!
//! # Invariants
//!
//! 1. A folder's children are the only place nodes nest; leaves never hold
//!    nodes.
//! 2. A leaf's value always has the primitive type of its kind. The typed
//!    writers ([`Node::with_value`], [`Node::set_value`]) refuse anything
//!    else instead of coercing.
//! 3. Tree shape (keys and which of them are folders) is only ever set by the
//!    builder. Nothing in this module adds or removes children.

use std::fmt;

use crate::path::NodePath;
use crate::value::{Action, Computed, Map, Value};

/// `$`-prefixed metadata carried through unchanged.
pub type Meta = Map<Value>;

/// Reserved first character of metadata keys.
pub const META_SIGIL: char = '$';

/// Whether `key` names metadata rather than a child control.
#[must_use]
pub fn is_meta_key(key: &str) -> bool {
    key.starts_with(META_SIGIL)
}

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

/// Which control renders a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Free numeric input.
    Number,
    /// Bounded slider (both `min` and `max` present).
    Range,
    /// Checkbox.
    Boolean,
    /// Text input.
    String,
    /// Color picker over `#rrggbb` strings.
    Color,
    /// Button invoking an action.
    Button,
    /// Group of child controls.
    Folder,
    /// Pre-classified node naming its own control.
    Custom,
}

impl NodeKind {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Range => "range",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Color => "color",
            Self::Button => "button",
            Self::Folder => "folder",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Bound
// ---------------------------------------------------------------------------

/// A numeric bound or step: fixed, or computed each time a control reads it.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// Constant.
    Fixed(f64),
    /// Re-evaluated on every read.
    Computed(Computed),
}

impl Bound {
    /// Current numeric value of the bound.
    #[must_use]
    pub fn resolve(&self) -> f64 {
        match self {
            Self::Fixed(n) => *n,
            Self::Computed(f) => f.eval(),
        }
    }

    /// Interpret a value as a bound. Only numbers and computed numbers qualify.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Fixed(*n)),
            Value::Computed(f) => Some(Self::Computed(f.clone())),
            _ => None,
        }
    }

    /// The bound as a value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Fixed(n) => Value::Number(*n),
            Self::Computed(f) => Value::Computed(f.clone()),
        }
    }
}

impl From<f64> for Bound {
    fn from(n: f64) -> Self {
        Self::Fixed(n)
    }
}

impl From<Computed> for Bound {
    fn from(f: Computed) -> Self {
        Self::Computed(f)
    }
}

// ---------------------------------------------------------------------------
// Node payloads
// ---------------------------------------------------------------------------

/// Payload shared by [`Node::Number`] and [`Node::Range`].
///
/// A `Number` node may still carry a lone `min` or `max`; the bound stays
/// inert until its counterpart exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberNode {
    /// Current value.
    pub value: f64,
    /// Lower bound.
    pub min: Option<Bound>,
    /// Upper bound.
    pub max: Option<Bound>,
    /// Increment.
    pub step: Option<Bound>,
    /// Metadata.
    pub meta: Meta,
}

impl NumberNode {
    /// Unbounded number.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self {
            value,
            min: None,
            max: None,
            step: None,
            meta: Meta::new(),
        }
    }

    /// Whether both bounds are present.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }
}

/// Payload of scalar leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf<T> {
    /// Current value.
    pub value: T,
    /// Metadata.
    pub meta: Meta,
}

impl<T> Leaf<T> {
    /// Leaf without metadata.
    pub fn new(value: T) -> Self {
        Self {
            value,
            meta: Meta::new(),
        }
    }
}

/// A group of child nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Folder {
    /// Children in declaration order.
    pub children: Map<Node>,
    /// Metadata (`$title`, `$collapsed`, ...).
    pub meta: Meta,
}

impl Folder {
    /// Empty folder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// A pre-classified node naming its own control.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomNode {
    /// Control name understood by the rendering surface.
    pub component: String,
    /// Current value, any shape.
    pub value: Value,
    /// Metadata.
    pub meta: Meta,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One classified entry of the control tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Free numeric input.
    Number(NumberNode),
    /// Bounded slider.
    Range(NumberNode),
    /// Checkbox.
    Boolean(Leaf<bool>),
    /// Text input.
    String(Leaf<String>),
    /// Color picker.
    Color(Leaf<String>),
    /// Button.
    Button(Leaf<Action>),
    /// Group.
    Folder(Folder),
    /// Custom control.
    Custom(CustomNode),
}

impl Node {
    /// Unbounded number leaf.
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Number(NumberNode::new(value))
    }

    /// Range leaf with fixed bounds.
    #[must_use]
    pub fn range(value: f64, min: f64, max: f64) -> Self {
        Self::Range(NumberNode {
            min: Some(Bound::Fixed(min)),
            max: Some(Bound::Fixed(max)),
            ..NumberNode::new(value)
        })
    }

    /// Checkbox leaf.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::Boolean(Leaf::new(value))
    }

    /// Text leaf.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(Leaf::new(value.into()))
    }

    /// Color leaf.
    #[must_use]
    pub fn color(value: impl Into<String>) -> Self {
        Self::Color(Leaf::new(value.into()))
    }

    /// Button leaf.
    pub fn button(action: impl Fn() + 'static) -> Self {
        Self::Button(Leaf::new(Action::new(action)))
    }

    /// Custom leaf.
    #[must_use]
    pub fn custom(component: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Custom(CustomNode {
            component: component.into(),
            value: value.into(),
            meta: Meta::new(),
        })
    }

    /// Folder from `(key, node)` pairs.
    pub fn folder<K: Into<String>>(children: impl IntoIterator<Item = (K, Node)>) -> Self {
        Self::Folder(Folder {
            children: children.into_iter().collect(),
            meta: Meta::new(),
        })
    }

    /// Control kind.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Number(_) => NodeKind::Number,
            Self::Range(_) => NodeKind::Range,
            Self::Boolean(_) => NodeKind::Boolean,
            Self::String(_) => NodeKind::String,
            Self::Color(_) => NodeKind::Color,
            Self::Button(_) => NodeKind::Button,
            Self::Folder(_) => NodeKind::Folder,
            Self::Custom(_) => NodeKind::Custom,
        }
    }

    /// Metadata of this node.
    #[must_use]
    pub fn meta(&self) -> &Meta {
        match self {
            Self::Number(n) | Self::Range(n) => &n.meta,
            Self::Boolean(l) => &l.meta,
            Self::String(l) | Self::Color(l) => &l.meta,
            Self::Button(l) => &l.meta,
            Self::Folder(f) => &f.meta,
            Self::Custom(c) => &c.meta,
        }
    }

    /// Metadata for mutation.
    pub fn meta_mut(&mut self) -> &mut Meta {
        match self {
            Self::Number(n) | Self::Range(n) => &mut n.meta,
            Self::Boolean(l) => &mut l.meta,
            Self::String(l) | Self::Color(l) => &mut l.meta,
            Self::Button(l) => &mut l.meta,
            Self::Folder(f) => &mut f.meta,
            Self::Custom(c) => &mut c.meta,
        }
    }

    /// Whether this is a folder.
    #[must_use]
    pub const fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }

    /// Numeric payload of `Number` and `Range` nodes.
    #[must_use]
    pub const fn as_number(&self) -> Option<&NumberNode> {
        match self {
            Self::Number(n) | Self::Range(n) => Some(n),
            _ => None,
        }
    }

    /// Children, if this is a folder.
    #[must_use]
    pub const fn children(&self) -> Option<&Map<Node>> {
        match self {
            Self::Folder(f) => Some(&f.children),
            _ => None,
        }
    }

    /// Direct child by key.
    #[must_use]
    pub fn child(&self, key: &str) -> Option<&Node> {
        self.children().and_then(|children| children.get(key))
    }

    /// Descendant at `path` (the empty path is `self`).
    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<&Node> {
        path.keys()
            .iter()
            .try_fold(self, |node, key| node.child(key))
    }

    /// Descendant at `path` for mutation.
    pub fn get_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        path.keys().iter().try_fold(self, |node, key| match node {
            Self::Folder(f) => f.children.get_mut(key),
            _ => None,
        })
    }

    /// Current value of a leaf; `None` for folders.
    #[must_use]
    pub fn leaf_value(&self) -> Option<Value> {
        match self {
            Self::Number(n) | Self::Range(n) => Some(Value::Number(n.value)),
            Self::Boolean(l) => Some(Value::Bool(l.value)),
            Self::String(l) | Self::Color(l) => Some(Value::String(l.value.clone())),
            Self::Button(l) => Some(Value::Action(l.value.clone())),
            Self::Custom(c) => Some(c.value.clone()),
            Self::Folder(_) => None,
        }
    }

    /// Whether a leaf of this kind can hold `value`.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Number(_) | Self::Range(_) => matches!(value, Value::Number(_)),
            Self::Boolean(_) => matches!(value, Value::Bool(_)),
            Self::String(_) | Self::Color(_) => matches!(value, Value::String(_)),
            Self::Button(_) => matches!(value, Value::Action(_)),
            Self::Custom(_) => !matches!(value, Value::Node(_)),
            Self::Folder(_) => false,
        }
    }

    /// Type name a leaf of this kind expects, for diagnostics.
    #[must_use]
    pub const fn expected_type(&self) -> &'static str {
        match self {
            Self::Number(_) | Self::Range(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::String(_) | Self::Color(_) => "string",
            Self::Button(_) => "action",
            Self::Custom(_) => "plain value",
            Self::Folder(_) => "object",
        }
    }

    /// A copy of this leaf holding `value`, keeping every other field.
    ///
    /// Returns `None` for folders and for values the kind cannot hold.
    #[must_use]
    pub fn with_value(&self, value: &Value) -> Option<Self> {
        let mut next = self.clone();
        next.set_value(value).then_some(next)
    }

    /// Replace the value of this leaf in place. Returns `false` (and leaves
    /// the node untouched) for folders and mismatched values.
    pub fn set_value(&mut self, value: &Value) -> bool {
        match (self, value) {
            (Self::Number(n) | Self::Range(n), Value::Number(v)) => n.value = *v,
            (Self::Boolean(l), Value::Bool(v)) => l.value = *v,
            (Self::String(l) | Self::Color(l), Value::String(v)) => l.value.clone_from(v),
            (Self::Button(l), Value::Action(v)) => l.value = v.clone(),
            (Self::Custom(c), v) if !matches!(v, Value::Node(_)) => c.value = v.clone(),
            _ => return false,
        }
        true
    }

    /// Replace the value of the leaf at `path`.
    pub fn set_leaf_value(&mut self, path: &NodePath, value: &Value) -> bool {
        self.get_mut(path).is_some_and(|node| node.set_value(value))
    }

    /// Every leaf, depth-first in key order, with its path.
    #[must_use]
    pub fn leaves(&self) -> Vec<(NodePath, &Node)> {
        let mut out = Vec::new();
        collect_leaves(self, &mut NodePath::root(), &mut out);
        out
    }

    /// Keys and folder structure, without values.
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Folder(f) => Shape::Folder(
                f.children
                    .iter()
                    .map(|(key, child)| (key.to_owned(), child.shape()))
                    .collect(),
            ),
            leaf => Shape::Leaf(leaf.kind()),
        }
    }
}

fn collect_leaves<'a>(node: &'a Node, path: &mut NodePath, out: &mut Vec<(NodePath, &'a Node)>) {
    match node {
        Node::Folder(folder) => {
            for (key, child) in folder.children.iter() {
                path.push(key);
                collect_leaves(child, path, out);
                path.pop();
            }
        }
        leaf => out.push((path.clone(), leaf)),
    }
}

/// Structure of a tree with values erased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// A leaf of the given kind.
    Leaf(NodeKind),
    /// A folder and its children's shapes in key order.
    Folder(Vec<(String, Shape)>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::folder([
            ("speed", Node::number(5.0)),
            (
                "camera",
                Node::folder([("zoom", Node::range(1.0, 0.0, 4.0)), ("on", Node::boolean(true))]),
            ),
        ])
    }

    #[test]
    fn get_follows_paths() {
        let tree = sample();
        assert_eq!(
            tree.get(&NodePath::from("camera.zoom")).map(Node::kind),
            Some(NodeKind::Range)
        );
        assert!(tree.get(&NodePath::from("camera.missing")).is_none());
        assert!(tree.get(&NodePath::from("speed.deeper")).is_none());
        assert_eq!(tree.get(&NodePath::root()), Some(&tree));
    }

    #[test]
    fn set_value_rejects_mismatched_types() {
        let mut leaf = Node::number(1.0);
        assert!(!leaf.set_value(&Value::from("nope")));
        assert_eq!(leaf, Node::number(1.0));
        assert!(leaf.set_value(&Value::from(2.5)));
        assert_eq!(leaf.leaf_value(), Some(Value::Number(2.5)));
    }

    #[test]
    fn with_value_keeps_bounds() {
        let leaf = Node::range(1.0, 0.0, 4.0);
        let next = leaf.with_value(&Value::from(3)).expect("number accepted");
        let n = next.as_number().expect("numeric");
        assert_eq!(n.value, 3.0);
        assert_eq!(n.min, Some(Bound::Fixed(0.0)));
        assert_eq!(n.max, Some(Bound::Fixed(4.0)));
        assert_eq!(next.kind(), NodeKind::Range);
    }

    #[test]
    fn folders_hold_no_leaf_value() {
        assert_eq!(sample().leaf_value(), None);
        assert!(sample().with_value(&Value::from(1)).is_none());
    }

    #[test]
    fn leaves_are_depth_first() {
        let tree = sample();
        let paths: Vec<String> = tree.leaves().iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, vec!["speed", "camera.zoom", "camera.on"]);
    }

    #[test]
    fn set_leaf_value_reaches_nested_nodes() {
        let mut tree = sample();
        assert!(tree.set_leaf_value(&NodePath::from("camera.on"), &Value::Bool(false)));
        assert_eq!(
            tree.get(&NodePath::from("camera.on")).and_then(Node::leaf_value),
            Some(Value::Bool(false))
        );
        assert!(!tree.set_leaf_value(&NodePath::from("camera"), &Value::Bool(false)));
    }

    #[test]
    fn computed_bounds_resolve_on_read() {
        let limit = std::rc::Rc::new(std::cell::Cell::new(10.0));
        let source = std::rc::Rc::clone(&limit);
        let bound = Bound::Computed(Computed::new(move || source.get()));
        assert_eq!(bound.resolve(), 10.0);
        limit.set(20.0);
        assert_eq!(bound.resolve(), 20.0);
    }

    #[test]
    fn meta_keys_use_sigil() {
        assert!(is_meta_key("$title"));
        assert!(!is_meta_key("title"));
    }
}
