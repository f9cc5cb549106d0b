#![forbid(unsafe_code)]

//! Plain-text rendering of node stores.
//!
//! The outline is what a minimal surface would draw: one header per panel,
//! one line per folder, one line per control. It is deterministic, so its
//! checksum can be compared against golden files.
//!
//! ```text
//! panel 0
//!   speed [number] = 5
//!   Camera/
//!     FOV [range 10..120 step 1] = 60
//!   go [button] = <action>
//! ```

use std::fmt::Write as _;

use knobs_core::Value;
use knobs_runtime::{ControlState, NodeStore, controls};

const INDENT: &str = "  ";

/// Render every store, in order.
#[must_use]
pub fn render_outline(stores: &[NodeStore]) -> String {
    let mut out = String::new();
    for (index, store) in stores.iter().enumerate() {
        let _ = writeln!(out, "panel {index}");
        let mut open: Vec<String> = Vec::new();
        for binding in controls(store) {
            let sections = binding.sections();
            let shared = open
                .iter()
                .zip(&sections)
                .take_while(|(a, b)| a == b)
                .count();
            for (depth, title) in sections.iter().enumerate().skip(shared) {
                let _ = writeln!(out, "{}{title}/", INDENT.repeat(depth + 1));
            }
            if let Some(state) = binding.state() {
                let _ = writeln!(
                    out,
                    "{}{}",
                    INDENT.repeat(sections.len() + 1),
                    control_line(&state)
                );
            }
            open = sections;
        }
    }
    out
}

fn control_line(state: &ControlState) -> String {
    let mut kind = state.kind.as_str().to_owned();
    if let (Some(min), Some(max)) = (state.min, state.max) {
        let _ = write!(kind, " {min}..{max}");
    }
    if let Some(step) = state.step {
        let _ = write!(kind, " step {step}");
    }
    format!("{} [{kind}] = {}", state.label, format_value(&state.value))
}

/// Compact, stable rendering of a plain value.
#[must_use]
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{s:?}"),
        Value::Action(_) => "<action>".to_owned(),
        Value::Computed(c) => format!("<computed {}>", c.eval()),
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{key}: {}", format_value(value)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        Value::Node(node) => format!("<{} node>", node.kind()),
    }
}
