#![forbid(unsafe_code)]

//! Untyped input values and the insertion-ordered [`Map`] they nest in.
//!
//! A [`Value`] is what a caller hands to the tree builder (a nested literal
//! of numbers, flags, strings, callables and groups) and also what the
//! flattener hands back (the plain values projection). Callables compare by
//! identity so whole snapshots stay `PartialEq`.

use std::fmt;
use std::rc::Rc;

use crate::node::Node;

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// String-keyed map that keeps insertion order.
///
/// Key order is the declaration order of the literal it came from and is the
/// order controls are rendered in. Maps here are small (a handful of keys per
/// group), so lookups are linear scans.
#[derive(Clone, PartialEq)]
pub struct Map<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for Map<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Map<V> {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create an empty map with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Look up a value by key for mutation.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert a value. An existing key keeps its position and the previous
    /// value is returned.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        if let Some(slot) = self.get_mut(&key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Iterate `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<V: fmt::Debug> fmt::Debug for Map<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for Map<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V> IntoIterator for Map<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Callables
// ---------------------------------------------------------------------------

/// A zero-argument callable carried as a button value.
///
/// Equality is pointer identity: two clones of the same `Action` are equal,
/// two separately created closures never are.
#[derive(Clone)]
pub struct Action(Rc<dyn Fn()>);

impl Action {
    /// Wrap a closure.
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the action.
    pub fn call(&self) {
        (self.0)();
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

/// A zero-argument callable producing a number, evaluated at read time.
///
/// Used for `min`/`max`/`step` bounds that depend on other state.
#[derive(Clone)]
pub struct Computed(Rc<dyn Fn() -> f64>);

impl Computed {
    /// Wrap a closure.
    pub fn new(f: impl Fn() -> f64 + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Evaluate the closure.
    #[must_use]
    pub fn eval(&self) -> f64 {
        (self.0)()
    }
}

impl PartialEq for Computed {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Computed({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// An untyped value: input to the tree builder and output of the flattener.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent value. Never classifiable.
    Null,
    /// A flag.
    Bool(bool),
    /// A number.
    Number(f64),
    /// Text. `#rrggbb` strings classify as colors.
    String(String),
    /// A callable; classifies as a button.
    Action(Action),
    /// A callable number; only valid as a numeric bound.
    Computed(Computed),
    /// A nested group (or a numeric-like `{ value, min, max, step }` record).
    Object(Map<Value>),
    /// An already classified node, accepted verbatim.
    Node(Box<Node>),
}

impl Value {
    /// Build an object from `(key, value)` pairs.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }

    /// Wrap a closure as an action value.
    pub fn action(f: impl Fn() + 'static) -> Self {
        Self::Action(Action::new(f))
    }

    /// Wrap a closure as a computed number.
    pub fn computed(f: impl Fn() -> f64 + 'static) -> Self {
        Self::Computed(Computed::new(f))
    }

    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Action(_) => "action",
            Self::Computed(_) => "computed",
            Self::Object(_) => "object",
            Self::Node(_) => "node",
        }
    }

    /// Whether this is [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The number, if this is one.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The flag, if this is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The action, if this is one.
    #[must_use]
    pub const fn as_action(&self) -> Option<&Action> {
        match self {
            Self::Action(a) => Some(a),
            _ => None,
        }
    }

    /// The entries, if this is an object.
    #[must_use]
    pub const fn as_object(&self) -> Option<&Map<Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Mutable entries, if this is an object.
    pub fn as_object_mut(&mut self) -> Option<&mut Map<Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Member lookup on objects; `None` for every other variant.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Action> for Value {
    fn from(action: Action) -> Self {
        Self::Action(action)
    }
}

impl From<Computed> for Value {
    fn from(computed: Computed) -> Self {
        Self::Computed(computed)
    }
}

impl From<Map<Value>> for Value {
    fn from(map: Map<Value>) -> Self {
        Self::Object(map)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Self::Node(Box::new(node))
    }
}

// ---------------------------------------------------------------------------
// JSON interop
// ---------------------------------------------------------------------------

#[cfg(feature = "serde")]
impl Value {
    /// Convert a JSON document into a value.
    ///
    /// Arrays become objects keyed by index (`"0"`, `"1"`, ...), matching how
    /// a group of positional entries is presented as a folder.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::Object(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), Self::from_json(item)))
                    .collect(),
            ),
            serde_json::Value::Object(fields) => Self::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert a plain value into JSON.
    ///
    /// Callables and non-finite numbers have no JSON form and become `null`.
    /// Embedded nodes are flattened first.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null | Self::Action(_) | Self::Computed(_) => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.to_owned(), v.to_json())).collect(),
            ),
            Self::Node(node) => crate::project::extract(node).to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_keeps_insertion_order() {
        let map: Map<i32> = [("b", 1), ("a", 2), ("c", 3)].into_iter().collect();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn map_insert_replaces_in_place() {
        let mut map: Map<i32> = [("x", 1), ("y", 2)].into_iter().collect();
        assert_eq!(map.insert("x", 10), Some(1));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(map.get("x"), Some(&10));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn actions_compare_by_identity() {
        let a = Action::new(|| {});
        let b = Action::new(|| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn computed_evaluates_lazily() {
        let cell = Rc::new(std::cell::Cell::new(1.0));
        let source = Rc::clone(&cell);
        let computed = Computed::new(move || source.get() * 2.0);
        assert_eq!(computed.eval(), 2.0);
        cell.set(4.0);
        assert_eq!(computed.eval(), 8.0);
    }

    #[test]
    fn object_constructor_converts_members() {
        let value = Value::object([("speed", Value::from(5)), ("on", Value::from(true))]);
        assert_eq!(value.get("speed"), Some(&Value::Number(5.0)));
        assert_eq!(value.get("on").and_then(Value::as_bool), Some(true));
        assert_eq!(value.get("missing"), None);
    }

    #[test]
    fn type_names_are_stable() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::action(|| {}).type_name(), "action");
        assert_eq!(Value::computed(|| 1.0).type_name(), "computed");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_arrays_become_indexed_objects() {
        let value = Value::from_json(serde_json::json!({ "list": [1, "two"] }));
        let list = value.get("list").and_then(Value::as_object).expect("object");
        assert_eq!(list.keys().collect::<Vec<_>>(), vec!["0", "1"]);
        assert_eq!(list.get("1"), Some(&Value::from("two")));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn callables_serialize_as_null() {
        let value = Value::object([("go", Value::action(|| {})), ("n", Value::from(1))]);
        assert_eq!(value.to_json(), serde_json::json!({ "go": null, "n": 1.0 }));
    }
}
