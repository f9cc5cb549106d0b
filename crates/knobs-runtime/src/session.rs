#![forbid(unsafe_code)]

//! Panel sessions: one control tree paired with its plain-value projection.
//!
//! # Design
//!
//! A [`Panel`] owns two stores:
//!
//! - the **node store** ([`NodeStore`]) holds the annotated tree and is what
//!   the rendering surface reads and writes;
//! - the **value store** ([`ValueStore`]) holds the plain projection and is
//!   what the owning program subscribes to.
//!
//! Edits flow both ways. A write into the node store is re-extracted and
//! published to the value store. A [`Panel::set`] is published to the value
//! store and merged into the node store. The [`SyncState`] machine keeps the
//! second direction from bouncing back through the first.
//!
//! # Activation
//!
//! A session only joins its [`Registry`] while someone observes its value
//! store. The first [`Panel::subscribe`] registers the node store and
//! refreshes the surface; dropping the last returned [`Subscription`]
//! unregisters and refreshes again.
//!
//! # Invariants
//!
//! 1. Every `set` publishes exactly once to value-store subscribers.
//! 2. While `Merging`, node-store writes are not re-extracted.
//! 3. [`Panel::get`] is the last snapshot published to the value store.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use knobs_core::{KnobError, Node, Value, build, extract, merge_report};
use tracing::{debug, debug_span, trace, warn};

use crate::reactive::{NotifyPolicy, Observable, Subscription};
use crate::registry::{Registry, SessionId};

/// Store holding a session's annotated control tree.
pub type NodeStore = Observable<Node>;

/// Store holding a session's plain values.
pub type ValueStore = Observable<Value>;

/// Synchronization state of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncState {
    /// No external write in progress.
    #[default]
    Idle,
    /// An external write is being merged into the node tree.
    Merging,
}

/// Holds a session in [`SyncState::Merging`] and returns it to `Idle` on
/// drop, even if a subscriber panics.
struct MergeGuard<'a> {
    state: &'a Cell<SyncState>,
}

impl<'a> MergeGuard<'a> {
    fn enter(state: &'a Cell<SyncState>) -> Option<Self> {
        match state.replace(SyncState::Merging) {
            SyncState::Idle => Some(Self { state }),
            SyncState::Merging => None,
        }
    }
}

impl Drop for MergeGuard<'_> {
    fn drop(&mut self) {
        self.state.set(SyncState::Idle);
    }
}

struct SessionState {
    id: SessionId,
    registry: Registry,
    nodes: NodeStore,
    values: ValueStore,
    cached: RefCell<Value>,
    sync: Cell<SyncState>,
    link: RefCell<Option<Subscription>>,
}

/// A live control panel.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct Panel {
    state: Rc<SessionState>,
}

impl std::fmt::Debug for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Panel")
            .field("id", &self.state.id)
            .field("sync", &self.state.sync.get())
            .field("active", &self.is_active())
            .field("values", &self.state.cached.borrow())
            .finish()
    }
}

impl Panel {
    /// Build a panel from a nested plain object on the global registry.
    ///
    /// # Errors
    ///
    /// [`KnobError::InvalidInput`] when the input (or a nested value) has no
    /// control kind.
    pub fn new(initial: &Value) -> Result<Self, KnobError> {
        Self::with_registry(initial, &Registry::global())
    }

    /// Build a panel bound to an explicit registry.
    ///
    /// # Errors
    ///
    /// See [`Panel::new`].
    pub fn with_registry(initial: &Value, registry: &Registry) -> Result<Self, KnobError> {
        let tree = build(initial)?;
        let snapshot = extract(&tree);
        let id = registry.next_session_id();

        let state = Rc::new(SessionState {
            id,
            registry: registry.clone(),
            nodes: Observable::with_policy(tree, NotifyPolicy::Always),
            values: Observable::with_policy(snapshot.clone(), NotifyPolicy::Always),
            cached: RefCell::new(snapshot),
            sync: Cell::new(SyncState::Idle),
            link: RefCell::new(None),
        });

        let weak = Rc::downgrade(&state);
        state.values.on_first_subscriber(move || {
            if let Some(state) = weak.upgrade() {
                activate(&state);
            }
        });
        let weak = Rc::downgrade(&state);
        state.values.on_last_unsubscribe(move || {
            if let Some(state) = weak.upgrade() {
                deactivate(&state);
            }
        });

        debug!(session = %id, "panel created");
        Ok(Self { state })
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.state.id
    }

    /// Registry this session joins while observed.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.state.registry
    }

    /// Internal store handed to the rendering surface.
    #[must_use]
    pub fn nodes(&self) -> NodeStore {
        self.state.nodes.clone()
    }

    /// Last plain-value snapshot.
    #[must_use]
    pub fn get(&self) -> Value {
        self.state.cached.borrow().clone()
    }

    /// Current synchronization state.
    #[must_use]
    pub fn sync_state(&self) -> SyncState {
        self.state.sync.get()
    }

    /// Whether the session is currently registered (has subscribers).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.link.borrow().is_some()
    }

    /// Number of value-store subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.values.subscriber_count()
    }

    /// Observe plain values.
    ///
    /// `listener` is called with the current snapshot before this returns,
    /// then on every publish. The first subscriber activates the session;
    /// later ones re-register it if a [`Registry::reset`] dropped it.
    /// The returned guard keeps the session alive.
    pub fn subscribe(&self, listener: impl Fn(&Value) + 'static) -> Subscription {
        let listener = Rc::new(listener);
        let forward = Rc::clone(&listener);
        let inner = self.state.values.subscribe(move |values| forward(values));
        rejoin(&self.state);
        listener(&self.state.values.get());

        let session = Rc::clone(&self.state);
        Subscription::from_release(move || {
            drop(inner);
            drop(session);
        })
    }

    /// Replace the plain values and merge them into the control tree.
    ///
    /// Keys the tree does not know, or values of the wrong type, are skipped.
    /// A call made while this session is already merging (from inside one of
    /// its own subscribers) is ignored.
    pub fn set(&self, values: Value) {
        let Some(_guard) = MergeGuard::enter(&self.state.sync) else {
            warn!(session = %self.state.id, "re-entrant set ignored while merging");
            return;
        };
        let _span = debug_span!(
            "knobs.sync",
            session = %self.state.id,
            direction = "external_to_internal"
        )
        .entered();

        *self.state.cached.borrow_mut() = values.clone();
        self.state.values.set(values.clone());

        let (merged, report) = self.state.nodes.with(|tree| merge_report(tree, &values));
        if !report.is_clean() {
            debug!(skipped = report.skipped().len(), "partial merge");
        }
        self.state.nodes.set(merged);
    }

    /// Derive the next plain values from the last snapshot and [`set`](Self::set)
    /// them.
    pub fn update(&self, f: impl FnOnce(&Value) -> Value) {
        if self.state.sync.get() == SyncState::Merging {
            warn!(session = %self.state.id, "re-entrant update ignored while merging");
            return;
        }
        let current = self.get();
        self.set(f(&current));
    }
}

fn activate(state: &Rc<SessionState>) {
    debug!(session = %state.id, "panel activated");
    state.registry.register(state.id, &state.nodes);
    state.registry.refresh();

    // Catch up with node-store writes made while nobody was listening.
    let fresh = state.nodes.with(extract);
    if *state.cached.borrow() != fresh {
        *state.cached.borrow_mut() = fresh.clone();
        state.values.set(fresh);
    }

    let weak = Rc::downgrade(state);
    let link = state.nodes.subscribe(move |tree| sync_to_values(&weak, tree));
    *state.link.borrow_mut() = Some(link);
}

/// Re-register an active session the registry dropped (after a reset).
fn rejoin(state: &Rc<SessionState>) {
    if state.link.borrow().is_none() || state.registry.contains(state.id) {
        return;
    }
    debug!(session = %state.id, "panel rejoined registry");
    state.registry.register(state.id, &state.nodes);
    state.registry.refresh();
}

fn deactivate(state: &Rc<SessionState>) {
    debug!(session = %state.id, "panel deactivated");
    let link = state.link.borrow_mut().take();
    drop(link);
    state.registry.unregister(&state.nodes);
    state.registry.refresh();
}

fn sync_to_values(weak: &Weak<SessionState>, tree: &Node) {
    let Some(state) = weak.upgrade() else {
        return;
    };
    if state.sync.get() == SyncState::Merging {
        trace!(session = %state.id, "node write during merge not re-extracted");
        return;
    }
    let _span = debug_span!(
        "knobs.sync",
        session = %state.id,
        direction = "internal_to_external"
    )
    .entered();

    let fresh = extract(tree);
    *state.cached.borrow_mut() = fresh.clone();
    state.values.set(fresh);
}
