#![forbid(unsafe_code)]

//! Recording surface host.
//!
//! [`RecordingHost`] stands in for a real rendering environment. Every
//! surface it mounts appends to a shared [`SurfaceLog`]: mounts, destroys,
//! and each update together with its text outline. The log also keeps the
//! stores of the latest update so a test can act as the user and edit them.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use knobs_runtime::{NodeStore, Surface, SurfaceHost};
use tracing::trace;

use crate::outline::render_outline;

/// One thing that happened to a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Surface `id` was mounted.
    Mount(u32),
    /// Surface `id` re-rendered `panels` stores.
    Update {
        /// Surface id.
        surface: u32,
        /// Number of stores handed over.
        panels: usize,
        /// Text outline of those stores.
        outline: String,
    },
    /// Surface `id` was destroyed.
    Destroy(u32),
}

#[derive(Default)]
struct LogInner {
    events: Vec<SurfaceEvent>,
    stores: Vec<NodeStore>,
}

/// Shared event log. Cloning yields another handle to the same log.
#[derive(Clone, Default)]
pub struct SurfaceLog {
    inner: Rc<RefCell<LogInner>>,
}

impl std::fmt::Debug for SurfaceLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceLog")
            .field("events", &self.inner.borrow().events)
            .finish()
    }
}

impl SurfaceLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far.
    #[must_use]
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.inner.borrow().events.clone()
    }

    /// Forget recorded events (the latest stores are kept).
    pub fn clear(&self) {
        self.inner.borrow_mut().events.clear();
    }

    /// Number of mounts.
    #[must_use]
    pub fn mounts(&self) -> usize {
        self.count(|e| matches!(e, SurfaceEvent::Mount(_)))
    }

    /// Number of updates.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.count(|e| matches!(e, SurfaceEvent::Update { .. }))
    }

    /// Number of destroys.
    #[must_use]
    pub fn destroys(&self) -> usize {
        self.count(|e| matches!(e, SurfaceEvent::Destroy(_)))
    }

    /// Store count of the latest update.
    #[must_use]
    pub fn last_panels(&self) -> Option<usize> {
        self.inner.borrow().events.iter().rev().find_map(|e| match e {
            SurfaceEvent::Update { panels, .. } => Some(*panels),
            _ => None,
        })
    }

    /// Outline of the latest update.
    #[must_use]
    pub fn last_outline(&self) -> Option<String> {
        self.inner.borrow().events.iter().rev().find_map(|e| match e {
            SurfaceEvent::Update { outline, .. } => Some(outline.clone()),
            _ => None,
        })
    }

    /// Stores handed to the latest update.
    #[must_use]
    pub fn stores(&self) -> Vec<NodeStore> {
        self.inner.borrow().stores.clone()
    }

    fn count(&self, pred: impl Fn(&SurfaceEvent) -> bool) -> usize {
        self.inner.borrow().events.iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: SurfaceEvent) {
        trace!(?event, "surface event");
        self.inner.borrow_mut().events.push(event);
    }
}

/// Surface host that records instead of drawing.
#[derive(Debug)]
pub struct RecordingHost {
    log: SurfaceLog,
    available: Rc<Cell<bool>>,
    next_id: u32,
}

impl RecordingHost {
    /// Available host writing to `log`.
    #[must_use]
    pub fn new(log: &SurfaceLog) -> Self {
        Self {
            log: log.clone(),
            available: Rc::new(Cell::new(true)),
            next_id: 0,
        }
    }

    /// Host that reports itself unavailable, like a headless environment.
    #[must_use]
    pub fn headless(log: &SurfaceLog) -> Self {
        let host = Self::new(log);
        host.available.set(false);
        host
    }

    /// Switch for availability that stays usable after the host is
    /// installed.
    #[must_use]
    pub fn availability(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.available)
    }
}

impl SurfaceHost for RecordingHost {
    fn is_available(&self) -> bool {
        self.available.get()
    }

    fn mount(&mut self) -> Box<dyn Surface> {
        let id = self.next_id;
        self.next_id += 1;
        self.log.push(SurfaceEvent::Mount(id));
        Box::new(RecordingSurface {
            id,
            log: self.log.clone(),
        })
    }
}

struct RecordingSurface {
    id: u32,
    log: SurfaceLog,
}

impl Surface for RecordingSurface {
    fn update(&mut self, stores: &[NodeStore]) {
        let outline = render_outline(stores);
        self.log.inner.borrow_mut().stores = stores.to_vec();
        self.log.push(SurfaceEvent::Update {
            surface: self.id,
            panels: stores.len(),
            outline,
        });
    }

    fn destroy(&mut self) {
        self.log.inner.borrow_mut().stores.clear();
        self.log.push(SurfaceEvent::Destroy(self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knobs_runtime::Registry;

    #[test]
    fn records_lifecycle() {
        let log = SurfaceLog::new();
        let registry = Registry::new();
        registry.install_host(RecordingHost::new(&log));
        registry.set_visible(false);
        registry.set_visible(true);
        assert_eq!(
            log.events(),
            vec![
                SurfaceEvent::Mount(0),
                SurfaceEvent::Update {
                    surface: 0,
                    panels: 0,
                    outline: String::new()
                },
                SurfaceEvent::Destroy(0),
                SurfaceEvent::Mount(1),
                SurfaceEvent::Update {
                    surface: 1,
                    panels: 0,
                    outline: String::new()
                },
            ]
        );
        assert_eq!((log.mounts(), log.updates(), log.destroys()), (2, 2, 1));
    }

    #[test]
    fn headless_host_records_nothing() {
        let log = SurfaceLog::new();
        let registry = Registry::new();
        let host = RecordingHost::headless(&log);
        let switch = host.availability();
        registry.install_host(host);
        registry.refresh();
        assert!(log.events().is_empty());

        switch.set(true);
        registry.refresh();
        assert_eq!(log.mounts(), 1);
        assert_eq!(log.last_panels(), Some(0));
    }
}
