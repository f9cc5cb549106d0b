#![forbid(unsafe_code)]

//! knobs public facade crate.
//!
//! Turn a nested literal of tunable values into a live control panel:
//!
//! ```ignore
//! use knobs::prelude::*;
//!
//! let panel = knobs::panel(&Value::object([
//!     ("speed", Value::from(5)),
//!     ("tint", Value::from("#ff8800")),
//!     ("pos", Value::object([("value", 3), ("min", 0), ("max", 10)])),
//! ]))?;
//!
//! let _sub = panel.subscribe(|values| println!("{values:?}"));
//! panel.update(|v| v.clone());
//! knobs::toggle(false);
//! ```
//!
//! Panels live on the per-thread global registry. Without an installed
//! [`SurfaceHost`] nothing is drawn, but values still sync.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use knobs_core::{KnobError, Node, NodeKind, NodePath, Value};
pub use knobs_runtime::{
    ControlBinding, ControlState, KnobsConfig, NodeStore, Panel, Registry, RegistryOrder,
    Subscription, Surface, SurfaceHost, controls,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for knobs.
#[derive(Debug)]
pub enum Error {
    /// Building or syncing a control tree failed.
    Knob(KnobError),
    /// Loading configuration failed.
    Config(knobs_runtime::ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Knob(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Knob(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<KnobError> for Error {
    fn from(err: KnobError) -> Self {
        Self::Knob(err)
    }
}

impl From<knobs_runtime::ConfigError> for Error {
    fn from(err: knobs_runtime::ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Standard result type for knobs APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Entry points ---------------------------------------------------------

/// Create a panel on the global registry.
///
/// The panel joins the registry (and shows up on the surface) once it has a
/// subscriber.
pub fn panel(initial: &Value) -> Result<Panel> {
    Ok(Panel::new(initial)?)
}

/// Create a panel from a JSON document. Arrays become index-keyed folders.
#[cfg(feature = "serde")]
pub fn panel_from_json(initial: serde_json::Value) -> Result<Panel> {
    panel(&Value::from_json(initial))
}

/// Show or hide the rendering surface.
pub fn toggle(visible: bool) {
    Registry::global().set_visible(visible);
}

/// Install the environment that mounts the rendering surface.
pub fn install_host(host: impl SurfaceHost + 'static) {
    Registry::global().install_host(host);
}

/// Apply a configuration to the global registry.
pub fn configure(config: KnobsConfig) {
    Registry::global().configure(config);
}

/// Load a TOML configuration file and apply it.
#[cfg(feature = "config")]
pub fn configure_from_file(path: impl AsRef<std::path::Path>) -> Result<()> {
    configure(KnobsConfig::from_toml_file(path)?);
    Ok(())
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{Error, Panel, Result, Subscription, Value};

    pub use crate::{core, runtime};
}

pub use knobs_core as core;
pub use knobs_runtime as runtime;
