#![no_main]

use arbitrary::Arbitrary;
use knobs_core::{Map, Value, build, extract, merge};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Plain {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Object(Vec<(String, Plain)>),
}

impl Plain {
    fn into_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Number(n) => Value::Number(n),
            Self::Text(s) => Value::String(s),
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

fuzz_target!(|input: (Plain, Plain)| {
    let (literal, update) = input;
    let Ok(tree) = build(&literal.into_value()) else {
        return;
    };
    // Merging arbitrary values keeps the shape, and merging the tree's own
    // values back is a no-op on shape and on extracted values.
    let merged = merge(&tree, &update.into_value());
    assert_eq!(merged.shape(), tree.shape());

    let own = extract(&merged);
    let again = merge(&merged, &own);
    assert_eq!(again.shape(), merged.shape());
});
