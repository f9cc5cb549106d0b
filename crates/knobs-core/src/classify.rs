#![forbid(unsafe_code)]

//! Structural classification of one input level.
//!
//! # Decision procedure
//!
//! Classification walks [`RULE_ORDER`] and takes the first [`ShapeRule`]
//! whose predicate matches:
//!
//! | Order | Rule            | Input                                         | Node           |
//! |-------|-----------------|-----------------------------------------------|----------------|
//! | 1     | `Number`        | number                                        | `Number`       |
//! | 2     | `Boolean`       | bool                                          | `Boolean`      |
//! | 3     | `Color`         | string matching `#rrggbb`                     | `Color`        |
//! | 4     | `String`        | any other string                              | `String`       |
//! | 5     | `Action`        | callable                                      | `Button`       |
//! | 6     | `Passthrough`   | pre-classified node                           | unchanged      |
//! | 7     | `NumericLike`   | `{ value: number, min?, max?, step? }`        | `Range`/`Number` |
//! | 8     | `Folder`        | any other object                              | `Folder`       |
//!
//! `null` and a bare computed number match nothing and are rejected with
//! [`KnobError::InvalidInput`].
//!
//! Classification is a single level: a folder comes back as
//! [`Classified::Folder`] holding the entries still to be built.

use crate::error::{KnobError, Result};
use crate::node::{Bound, Leaf, Meta, Node, NumberNode, is_meta_key};
use crate::path::NodePath;
use crate::value::{Map, Value};

/// Keys a numeric-like object may hold besides metadata.
const NUMERIC_KEYS: [&str; 4] = ["value", "min", "max", "step"];

/// One predicate of the decision procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeRule {
    /// Plain number.
    Number,
    /// Plain flag.
    Boolean,
    /// `#rrggbb` string.
    Color,
    /// Any other string.
    String,
    /// Callable.
    Action,
    /// Pre-classified node.
    Passthrough,
    /// `{ value, min?, max?, step? }` record.
    NumericLike,
    /// Any other object.
    Folder,
}

/// Order in which rules are tried. First match wins.
pub const RULE_ORDER: [ShapeRule; 8] = [
    ShapeRule::Number,
    ShapeRule::Boolean,
    ShapeRule::Color,
    ShapeRule::String,
    ShapeRule::Action,
    ShapeRule::Passthrough,
    ShapeRule::NumericLike,
    ShapeRule::Folder,
];

impl ShapeRule {
    /// Whether this rule's predicate holds for `input`.
    #[must_use]
    pub fn matches(self, input: &Value) -> bool {
        match (self, input) {
            (Self::Number, Value::Number(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Action, Value::Action(_))
            | (Self::Passthrough, Value::Node(_))
            | (Self::Folder, Value::Object(_)) => true,
            (Self::Color, Value::String(s)) => is_hex_color(s),
            (Self::String, Value::String(_)) => true,
            (Self::NumericLike, Value::Object(map)) => is_numeric_like(map),
            _ => false,
        }
    }
}

/// Result of classifying one level.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified<'a> {
    /// A finished node.
    Node(Node),
    /// A folder whose entries still need building.
    Folder(&'a Map<Value>),
}

/// First rule matching `input`, if any.
#[must_use]
pub fn matched_rule(input: &Value) -> Option<ShapeRule> {
    RULE_ORDER.into_iter().find(|rule| rule.matches(input))
}

/// Classify a single input value.
///
/// # Errors
///
/// [`KnobError::InvalidInput`] (at the root path) when no rule matches.
pub fn classify(input: &Value) -> Result<Classified<'_>> {
    let Some(rule) = matched_rule(input) else {
        return Err(KnobError::InvalidInput {
            path: NodePath::root(),
            found: input.type_name(),
        });
    };

    let node = match (rule, input) {
        (ShapeRule::Number, Value::Number(n)) => Node::Number(NumberNode::new(*n)),
        (ShapeRule::Boolean, Value::Bool(b)) => Node::Boolean(Leaf::new(*b)),
        (ShapeRule::Color, Value::String(s)) => Node::Color(Leaf::new(s.clone())),
        (ShapeRule::String, Value::String(s)) => Node::String(Leaf::new(s.clone())),
        (ShapeRule::Action, Value::Action(a)) => Node::Button(Leaf::new(a.clone())),
        (ShapeRule::Passthrough, Value::Node(node)) => (**node).clone(),
        (ShapeRule::NumericLike, Value::Object(map)) => numeric_node(map),
        (ShapeRule::Folder, Value::Object(map)) => return Ok(Classified::Folder(map)),
        _ => unreachable!("rule {rule:?} matched a {} value", input.type_name()),
    };
    Ok(Classified::Node(node))
}

/// Whether `s` is `#` followed by exactly six hex digits.
#[must_use]
pub fn is_hex_color(s: &str) -> bool {
    s.strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Whether an object has the numeric-like shape.
///
/// `value` must be a number and every non-metadata key must be one of
/// `value`, `min`, `max`, `step`. A bound is a number, a computed number, or
/// an empty placeholder (`null`, `false`, `""`) that counts as unset.
#[must_use]
pub fn is_numeric_like(map: &Map<Value>) -> bool {
    if !matches!(map.get("value"), Some(Value::Number(_))) {
        return false;
    }
    map.iter().all(|(key, value)| {
        if is_meta_key(key) || key == "value" {
            return true;
        }
        NUMERIC_KEYS.contains(&key) && (is_unset_bound(value) || Bound::from_value(value).is_some())
    })
}

fn is_unset_bound(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn numeric_node(map: &Map<Value>) -> Node {
    let mut node = NumberNode::new(map.get("value").and_then(Value::as_f64).unwrap_or_default());
    node.min = map.get("min").and_then(Bound::from_value);
    node.max = map.get("max").and_then(Bound::from_value);
    node.step = map.get("step").and_then(Bound::from_value);
    node.meta = map
        .iter()
        .filter(|(key, _)| is_meta_key(key))
        .map(|(key, value)| (key, value.clone()))
        .collect::<Meta>();

    if map.contains_key("min") && map.contains_key("max") {
        Node::Range(node)
    } else {
        Node::Number(node)
    }
}
