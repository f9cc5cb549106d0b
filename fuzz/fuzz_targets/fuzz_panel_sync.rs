#![no_main]

use std::cell::Cell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use knobs_core::Value;
use knobs_runtime::{Panel, Registry, controls};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Subscribe,
    Unsubscribe,
    Set(u8, f64),
    Write(u8, f64),
    Toggle(bool),
}

fuzz_target!(|ops: Vec<Op>| {
    let registry = Registry::new();
    let initial = Value::object([
        ("a", Value::from(0)),
        ("b", Value::object([("value", 1), ("min", 0), ("max", 10)])),
        ("c", Value::object([("d", false)])),
    ]);
    let Ok(panel) = Panel::with_registry(&initial, &registry) else {
        return;
    };
    let published = Rc::new(Cell::new(0u64));
    let mut subs = Vec::new();

    for op in ops {
        match op {
            Op::Subscribe => {
                let count = Rc::clone(&published);
                subs.push(panel.subscribe(move |_| count.set(count.get() + 1)));
            }
            Op::Unsubscribe => {
                subs.pop();
            }
            Op::Set(key, n) => {
                let key = ["a", "b", "c", "zz"][usize::from(key % 4)];
                let before = published.get();
                panel.set(Value::object([(key, n)]));
                // One publish per subscriber, never more.
                assert!(published.get() - before <= subs.len() as u64);
            }
            Op::Write(index, n) => {
                let bindings = controls(&panel.nodes());
                if let Some(binding) = bindings.get(usize::from(index) % bindings.len()) {
                    let _ = binding.write(&Value::from(n));
                }
            }
            Op::Toggle(visible) => registry.set_visible(visible),
        }
        assert_eq!(registry.contains(panel.id()), !subs.is_empty());
    }
});
