#![forbid(unsafe_code)]

//! Runtime: reactive stores, panel sessions, and the rendering registry.
//!
//! # Key Components
//!
//! - [`Observable`] - shared value with ordered change notification
//! - [`Panel`] - one control tree kept in sync with its plain values
//! - [`Registry`] - active sessions and the lazily mounted [`Surface`]
//! - [`ControlBinding`] - headless read/write access to one leaf
//!
//! # Role in knobs
//! `knobs-runtime` is the stateful layer over `knobs-core`. A panel session
//! keeps its node tree in one store and the plain projection in another,
//! and joins the registry only while the owning program observes it.
//!
//! # How it fits in the system
//! Rendering lives behind the [`SurfaceHost`]/[`Surface`] traits. With no
//! host installed the runtime is headless: sessions still sync, refreshes
//! are silent no-ops.

pub mod config;
pub mod control;
pub mod reactive;
pub mod registry;
pub mod session;
pub mod surface;

pub use config::{ConfigError, KnobsConfig, RegistryOrder};
pub use control::{ControlBinding, ControlState, controls};
pub use reactive::{BatchScope, NotifyPolicy, Observable, Subscription};
pub use registry::{Registry, SessionId};
pub use session::{NodeStore, Panel, SyncState, ValueStore};
pub use surface::{Surface, SurfaceHost};
