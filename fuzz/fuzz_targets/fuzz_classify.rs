#![no_main]

use arbitrary::Arbitrary;
use knobs_core::{Map, Value, build, extract};
use libfuzzer_sys::fuzz_target;

/// Structured literal. Keys are short strings so `value`/`min`/`max`/`$`
/// collisions happen often.
#[derive(Arbitrary, Debug)]
enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Action,
    Computed(f64),
    Object(Vec<(String, Literal)>),
}

impl Literal {
    fn into_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Number(n) => Value::Number(n),
            Self::Text(s) => Value::String(s),
            Self::Action => Value::action(|| {}),
            Self::Computed(n) => Value::computed(move || n),
            Self::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key, value.into_value());
                }
                Value::Object(map)
            }
        }
    }
}

fuzz_target!(|literal: Literal| {
    // Building must never panic; it either succeeds or reports an error.
    let input = literal.into_value();
    if let Ok(tree) = build(&input) {
        // Every built tree projects to an object with a folder's keys.
        let plain = extract(&tree);
        let keys = plain.as_object().map(|m| m.len());
        assert_eq!(keys, tree.children().map(|c| c.len()));
    }
});
