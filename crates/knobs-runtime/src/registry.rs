#![forbid(unsafe_code)]

//! Process-wide registry of active panel sessions.
//!
//! # Design
//!
//! The [`Registry`] is an explicit context object: a cheap-clone handle to
//! shared state holding the visibility flag, the ordered node stores of every
//! active session, the installed [`SurfaceHost`], and the lazily mounted
//! [`Surface`]. Sessions receive the registry they belong to at creation;
//! [`Registry::global`] is the single per-thread access point used by the
//! facade.
//!
//! # Lifecycle
//!
//! - **Init**: no sessions, no surface, visibility from [`KnobsConfig`].
//! - **Refresh**: with a host available and the registry visible, mount a
//!   surface if none exists, then push the current stores to it.
//! - **Hide**: destroy the surface. Showing again mounts a new one.
//! - **Teardown** ([`Registry::reset`]): destroy the surface, drop all
//!   sessions, restore the configured visibility.
//!
//! Without a host (or with a host reporting itself unavailable) every refresh
//! is a silent no-op; [`Registry::try_refresh`] surfaces this as
//! [`KnobError::RegistryUnavailable`].

use std::cell::RefCell;
use std::rc::Rc;

use knobs_core::KnobError;
use tracing::{debug, info};

use crate::config::{KnobsConfig, RegistryOrder};
use crate::session::NodeStore;
use crate::surface::{Surface, SurfaceHost};

/// Creation-ordered identifier of a panel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Raw counter value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

struct Entry {
    id: SessionId,
    store: NodeStore,
}

struct RegistryState {
    config: KnobsConfig,
    visible: bool,
    entries: Vec<Entry>,
    host: Option<Box<dyn SurfaceHost>>,
    surface: Option<Box<dyn Surface>>,
    next_id: u64,
}

/// Shared handle to the registry state.
#[derive(Clone)]
pub struct Registry {
    state: Rc<RefCell<RegistryState>>,
}

thread_local! {
    static GLOBAL: Registry = Registry::new();
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Registry")
            .field("visible", &state.visible)
            .field(
                "sessions",
                &state.entries.iter().map(|e| e.id).collect::<Vec<_>>(),
            )
            .field("has_host", &state.host.is_some())
            .field("has_surface", &state.surface.is_some())
            .finish()
    }
}

impl Registry {
    /// Registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(KnobsConfig::default())
    }

    /// Registry with an explicit configuration.
    #[must_use]
    pub fn with_config(config: KnobsConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(RegistryState {
                visible: config.visible,
                config,
                entries: Vec::new(),
                host: None,
                surface: None,
                next_id: 0,
            })),
        }
    }

    /// The registry shared by everything on this thread.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL.with(Clone::clone)
    }

    /// Whether two handles share the same state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> KnobsConfig {
        self.state.borrow().config.clone()
    }

    /// Replace the configuration and apply its visibility.
    ///
    /// The new order applies to sessions registered from now on.
    pub fn configure(&self, config: KnobsConfig) {
        let visible = config.visible;
        self.state.borrow_mut().config = config;
        self.set_visible(visible);
    }

    /// Install the environment able to mount surfaces, replacing any previous
    /// one (and destroying its surface), then refresh.
    pub fn install_host(&self, host: impl SurfaceHost + 'static) {
        let old = {
            let mut state = self.state.borrow_mut();
            state.host = Some(Box::new(host));
            state.surface.take()
        };
        destroy(old);
        self.refresh();
    }

    /// Remove the host, destroying any mounted surface.
    pub fn remove_host(&self) {
        let old = {
            let mut state = self.state.borrow_mut();
            state.host = None;
            state.surface.take()
        };
        destroy(old);
    }

    /// Whether controls should be shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state.borrow().visible
    }

    /// Whether a surface is currently mounted.
    #[must_use]
    pub fn has_surface(&self) -> bool {
        self.state.borrow().surface.is_some()
    }

    /// Show or hide the controls.
    ///
    /// Unchanged visibility is a no-op. Showing refreshes (mounting lazily);
    /// hiding destroys the surface.
    pub fn set_visible(&self, visible: bool) {
        let hidden = {
            let mut state = self.state.borrow_mut();
            if state.visible == visible {
                return;
            }
            state.visible = visible;
            if visible { None } else { state.surface.take() }
        };
        debug!(visible, "registry visibility changed");
        if visible {
            self.refresh();
        } else {
            destroy(hidden);
        }
    }

    /// Add a session's node store. Registering the same store twice is a
    /// no-op.
    pub fn register(&self, id: SessionId, store: &NodeStore) {
        let mut state = self.state.borrow_mut();
        if state.entries.iter().any(|e| e.store.ptr_eq(store)) {
            return;
        }
        let index = match state.config.order {
            RegistryOrder::Append => state.entries.len(),
            RegistryOrder::Creation => state
                .entries
                .iter()
                .position(|e| e.id > id)
                .unwrap_or(state.entries.len()),
        };
        state.entries.insert(
            index,
            Entry {
                id,
                store: store.clone(),
            },
        );
        debug!(session = %id, index, "session registered");
    }

    /// Remove a session's node store. Returns whether it was present.
    pub fn unregister(&self, store: &NodeStore) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(index) = state.entries.iter().position(|e| e.store.ptr_eq(store)) else {
            return false;
        };
        let entry = state.entries.remove(index);
        debug!(session = %entry.id, "session unregistered");
        true
    }

    /// Registered node stores, in registry order.
    #[must_use]
    pub fn stores(&self) -> Vec<NodeStore> {
        self.state
            .borrow()
            .entries
            .iter()
            .map(|e| e.store.clone())
            .collect()
    }

    /// Registered session ids, in registry order.
    #[must_use]
    pub fn sessions(&self) -> Vec<SessionId> {
        self.state.borrow().entries.iter().map(|e| e.id).collect()
    }

    /// Whether a session is registered.
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.state.borrow().entries.iter().any(|e| e.id == id)
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    /// Whether no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }

    /// Push the current stores to the surface, mounting it if needed.
    ///
    /// Silently does nothing in headless environments.
    pub fn refresh(&self) {
        if let Err(err) = self.try_refresh() {
            debug!(%err, "refresh skipped");
        }
    }

    /// Like [`refresh`](Self::refresh), but reports a missing environment.
    ///
    /// # Errors
    ///
    /// [`KnobError::RegistryUnavailable`] when no host is installed or the
    /// host cannot mount surfaces right now.
    pub fn try_refresh(&self) -> Result<(), KnobError> {
        let (mut surface, stores) = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let Some(host) = state.host.as_mut() else {
                return Err(KnobError::RegistryUnavailable);
            };
            if !host.is_available() {
                return Err(KnobError::RegistryUnavailable);
            }
            if !state.visible {
                return Ok(());
            }
            let surface = match state.surface.take() {
                Some(surface) => surface,
                None => {
                    info!("mounting rendering surface");
                    host.mount()
                }
            };
            let stores: Vec<NodeStore> = state.entries.iter().map(|e| e.store.clone()).collect();
            (surface, stores)
        };

        // No borrow is held while the surface renders.
        surface.update(&stores);

        let spare = {
            let mut state = self.state.borrow_mut();
            if state.visible && state.surface.is_none() {
                state.surface = Some(surface);
                None
            } else {
                Some(surface)
            }
        };
        destroy(spare);
        Ok(())
    }

    /// Destroy the surface, drop every session, and restore the configured
    /// visibility. The host stays installed.
    ///
    /// Sessions that still have subscribers stay active and register again
    /// on their next [`Panel::subscribe`](crate::Panel::subscribe).
    pub fn reset(&self) {
        let old = {
            let mut state = self.state.borrow_mut();
            state.entries.clear();
            state.visible = state.config.visible;
            state.surface.take()
        };
        destroy(old);
        info!("registry reset");
    }

    pub(crate) fn next_session_id(&self) -> SessionId {
        let mut state = self.state.borrow_mut();
        let id = SessionId(state.next_id);
        state.next_id += 1;
        id
    }
}

fn destroy(surface: Option<Box<dyn Surface>>) {
    if let Some(mut surface) = surface {
        info!("destroying rendering surface");
        surface.destroy();
    }
}
