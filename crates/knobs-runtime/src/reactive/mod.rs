#![forbid(unsafe_code)]

//! Reactive stores.
//!
//! - [`Observable`]: shared value with synchronous, ordered change
//!   notification and first/last subscriber hooks.
//! - [`BatchScope`]: defer and coalesce notifications until a scope exits.

pub mod batch;
pub mod observable;

pub use batch::BatchScope;
pub use observable::{NotifyPolicy, Observable, Subscription};
