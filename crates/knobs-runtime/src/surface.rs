#![forbid(unsafe_code)]

//! Boundary between the registry and whatever draws the controls.
//!
//! The registry never renders anything itself. A [`SurfaceHost`] is the
//! environment that can show controls (a window, a terminal overlay, a web
//! page); it mounts a [`Surface`] on demand. The surface receives the full,
//! ordered list of registered node stores on every refresh and renders one
//! control per leaf, writing edits back into those stores.

use crate::session::NodeStore;

/// A mounted rendering surface.
pub trait Surface {
    /// Re-render exactly `stores`, in order.
    fn update(&mut self, stores: &[NodeStore]);

    /// Tear the surface down. Called once, right before it is dropped.
    fn destroy(&mut self) {}
}

/// An environment able to mount surfaces.
pub trait SurfaceHost {
    /// Whether a surface can exist right now. Headless hosts return `false`
    /// and every refresh becomes a no-op.
    fn is_available(&self) -> bool {
        true
    }

    /// Create a fresh surface.
    fn mount(&mut self) -> Box<dyn Surface>;
}
