#![forbid(unsafe_code)]

//! Core: value model, control classification, and tree projection.
//!
//! # Role in knobs
//! `knobs-core` is the pure data layer. It turns a nested literal of
//! tunable values into a typed control tree and projects that tree back to
//! plain values. Nothing here is reactive or stateful.
//!
//! # Primary responsibilities
//! - **Value**: untyped input and plain-value snapshots.
//! - **Node**: classified controls (number, range, boolean, string, color,
//!   button, folder, custom).
//! - **Classifier**: an ordered set of shape rules, first match wins.
//! - **Tree builder**: recursive classification with `$` metadata.
//! - **Projection**: [`extract`] and [`merge`].
//!
//! # How it fits in the system
//! `knobs-runtime` keeps one tree per panel session in a reactive store and
//! uses [`extract`]/[`merge`] to keep it in sync with the plain values the
//! owning program observes.

pub mod classify;
pub mod error;
mod logging;
pub mod node;
pub mod path;
pub mod project;
pub mod tree;
pub mod value;

pub use classify::{Classified, RULE_ORDER, ShapeRule, classify, is_hex_color, matched_rule};
pub use error::{KnobError, Result};
pub use node::{
    Bound, CustomNode, Folder, Leaf, META_SIGIL, Meta, Node, NodeKind, NumberNode, Shape,
    is_meta_key,
};
pub use path::NodePath;
pub use project::{MergeReport, extract, merge, merge_report};
pub use tree::build;
pub use value::{Action, Computed, Map, Value};
