#![forbid(unsafe_code)]

//! Observable value with ordered change notification and activation hooks.
//!
//! # Design
//!
//! [`Observable<T>`] keeps a value in shared, reference-counted storage
//! (`Rc<RefCell<..>>`). Writes notify every live subscriber synchronously,
//! in subscription order, before the write returns.
//!
//! Two hooks tie the store's lifetime to its audience: `on_first_subscriber`
//! fires when the subscriber count goes from zero to one (before the new
//! subscriber is added), `on_last_unsubscribe` when it drops back to zero.
//! Panel sessions use them to join and leave the rendering registry.
//!
//! # Invariants
//!
//! 1. `version` increases by exactly 1 per published write.
//! 2. Under [`NotifyPolicy::OnChange`], writing a value equal to the current
//!    one is a no-op. Under [`NotifyPolicy::Always`] every write publishes.
//! 3. Subscribers run in subscription order.
//! 4. A dropped [`Subscription`] is removed at once and never called again,
//!    even if the drop happens during a notification pass.
//!
//! # Failure Modes
//!
//! - **Re-entrant writes**: writing from inside a subscriber is allowed; no
//!   borrow is held while callbacks run. The nested write notifies before the
//!   outer pass resumes, so later subscribers of the outer pass see the
//!   outer value after the nested one. Sessions guard against this with
//!   their sync state machine.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug_span, trace};
use web_time::Instant;

use super::batch;

/// When a write publishes to subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotifyPolicy {
    /// Only when the new value differs (`PartialEq`).
    #[default]
    OnChange,
    /// On every write.
    Always,
}

struct Slot<T> {
    active: Cell<bool>,
    callback: Box<dyn Fn(&T)>,
}

type Hook = Box<dyn FnMut()>;

#[derive(Default)]
struct Hooks {
    on_first: Option<Hook>,
    on_last: Option<Hook>,
}

#[derive(Clone, Copy)]
enum Edge {
    First,
    Last,
}

struct ObservableInner<T> {
    value: T,
    version: u64,
    policy: NotifyPolicy,
    subscribers: Vec<Rc<Slot<T>>>,
    hooks: Hooks,
}

/// A shared, versioned value with change notification.
///
/// Cloning an `Observable` yields another handle to the same state.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("policy", &inner.policy)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T> Observable<T> {
    /// Whether two handles share the same state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Current version. Starts at 0.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Install the hook run when the first subscriber arrives.
    pub fn on_first_subscriber(&self, hook: impl FnMut() + 'static) {
        self.inner.borrow_mut().hooks.on_first = Some(Box::new(hook));
    }

    /// Install the hook run when the last subscriber leaves.
    pub fn on_last_unsubscribe(&self, hook: impl FnMut() + 'static) {
        self.inner.borrow_mut().hooks.on_last = Some(Box::new(hook));
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// New observable publishing only on change.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_policy(value, NotifyPolicy::OnChange)
    }

    /// New observable with an explicit [`NotifyPolicy`].
    #[must_use]
    pub fn with_policy(value: T, policy: NotifyPolicy) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                policy,
                subscribers: Vec::new(),
                hooks: Hooks::default(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    ///
    /// `f` must not write to this observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Write a value and publish it according to the policy.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.policy == NotifyPolicy::OnChange && inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Derive the next value from the current one and publish it according
    /// to the policy.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = self.with(f);
        self.set(next);
    }

    /// Subscribe to published writes.
    ///
    /// The callback is not invoked for the current value. Dropping the
    /// returned guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        if self.inner.borrow().subscribers.is_empty() {
            run_hook(&self.inner, Edge::First);
        }

        let slot = Rc::new(Slot {
            active: Cell::new(true),
            callback: Box::new(callback),
        });
        self.inner.borrow_mut().subscribers.push(Rc::clone(&slot));

        let weak = Rc::downgrade(&self.inner);
        Subscription::from_release(move || {
            slot.active.set(false);
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let now_empty = {
                let mut guard = inner.borrow_mut();
                let before = guard.subscribers.len();
                guard.subscribers.retain(|s| !Rc::ptr_eq(s, &slot));
                before != guard.subscribers.len() && guard.subscribers.is_empty()
            };
            if now_empty {
                run_hook(&inner, Edge::Last);
            }
        })
    }

    fn notify(&self) {
        let slots: Vec<Rc<Slot<T>>> = self.inner.borrow().subscribers.clone();
        if slots.is_empty() {
            return;
        }

        if batch::is_batching() {
            batch::record_write();
            for slot in slots {
                let key = Rc::as_ptr(&slot).cast::<()>() as usize;
                let source = self.clone();
                batch::defer_or_run_keyed(key, move || {
                    if slot.active.get() {
                        let latest = source.get();
                        (slot.callback)(&latest);
                    }
                });
            }
            return;
        }

        let value = self.get();
        let subscribers = slots.len() as u64;
        let start = Instant::now();
        let _span = debug_span!("knobs.store.notify", subscribers).entered();

        for slot in &slots {
            if slot.active.get() {
                (slot.callback)(&value);
            }
        }

        trace!(
            duration_us = start.elapsed().as_micros() as u64,
            subscribers, "store notified"
        );
    }
}

fn run_hook<T>(inner: &Rc<RefCell<ObservableInner<T>>>, edge: Edge) {
    let taken = {
        let mut guard = inner.borrow_mut();
        match edge {
            Edge::First => guard.hooks.on_first.take(),
            Edge::Last => guard.hooks.on_last.take(),
        }
    };
    let Some(mut hook) = taken else {
        return;
    };
    hook();

    // Put the hook back unless it was replaced while running.
    let mut guard = inner.borrow_mut();
    let slot = match edge {
        Edge::First => &mut guard.hooks.on_first,
        Edge::Last => &mut guard.hooks.on_last,
    };
    if slot.is_none() {
        *slot = Some(hook);
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping it (or calling [`unsubscribe`](Self::unsubscribe)) removes the
/// callback immediately.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Guard running `release` once, on drop or explicit unsubscribe.
    pub(crate) fn from_release(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Unsubscribe now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<u32>>, impl Fn(&i32) + 'static) {
        let count = Rc::new(Cell::new(0u32));
        let sink = Rc::clone(&count);
        (count, move |_: &i32| sink.set(sink.get() + 1))
    }

    #[test]
    fn get_set_basic() {
        let obs = Observable::new(42);
        assert_eq!(obs.get(), 42);
        obs.set(99);
        assert_eq!(obs.get(), 99);
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn on_change_skips_equal_writes() {
        let obs = Observable::new(1);
        let (count, cb) = counter();
        let _sub = obs.subscribe(cb);
        obs.set(1);
        assert_eq!(count.get(), 0);
        assert_eq!(obs.version(), 0);
    }

    #[test]
    fn always_publishes_equal_writes() {
        let obs = Observable::with_policy(1, NotifyPolicy::Always);
        let (count, cb) = counter();
        let _sub = obs.subscribe(cb);
        obs.set(1);
        obs.set(1);
        assert_eq!(count.get(), 2);
        assert_eq!(obs.version(), 2);
    }

    #[test]
    fn update_derives_from_current() {
        let obs = Observable::new(vec![1, 2]);
        obs.update(|v| {
            let mut next = v.clone();
            next.push(3);
            next
        });
        assert_eq!(obs.get(), vec![1, 2, 3]);
    }

    #[test]
    fn subscribe_does_not_replay_current_value() {
        let obs = Observable::new(5);
        let (count, cb) = counter();
        let _sub = obs.subscribe(cb);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn notification_order_is_subscription_order() {
        let obs = Observable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<Subscription> = ['A', 'B', 'C']
            .into_iter()
            .map(|tag| {
                let log = Rc::clone(&log);
                obs.subscribe(move |_| log.borrow_mut().push(tag))
            })
            .collect();
        obs.set(1);
        assert_eq!(*log.borrow(), vec!['A', 'B', 'C']);
        drop(subs);
    }

    #[test]
    fn drop_unsubscribes_immediately() {
        let obs = Observable::new(0);
        let (count, cb) = counter();
        let sub = obs.subscribe(cb);
        obs.set(1);
        drop(sub);
        assert_eq!(obs.subscriber_count(), 0);
        obs.set(2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn subscriber_dropped_mid_pass_is_skipped() {
        let obs = Observable::new(0);
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let killer = Rc::clone(&victim);
        let _first = obs.subscribe(move |_| {
            killer.borrow_mut().take();
        });
        let (count, cb) = counter();
        *victim.borrow_mut() = Some(obs.subscribe(cb));

        obs.set(1);
        assert_eq!(count.get(), 0);
        assert_eq!(obs.subscriber_count(), 1);
    }

    #[test]
    fn hooks_fire_on_first_and_last() {
        let obs = Observable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let (on_first, on_last) = (Rc::clone(&log), Rc::clone(&log));
        obs.on_first_subscriber(move || on_first.borrow_mut().push("first"));
        obs.on_last_unsubscribe(move || on_last.borrow_mut().push("last"));

        let a = obs.subscribe(|_| {});
        let b = obs.subscribe(|_| {});
        assert_eq!(*log.borrow(), vec!["first"]);
        drop(a);
        assert_eq!(*log.borrow(), vec!["first"]);
        b.unsubscribe();
        assert_eq!(*log.borrow(), vec!["first", "last"]);

        let _c = obs.subscribe(|_| {});
        assert_eq!(*log.borrow(), vec!["first", "last", "first"]);
    }

    #[test]
    fn first_hook_runs_before_subscriber_is_added() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(usize::MAX));
        let probe = obs.clone();
        let sink = Rc::clone(&seen);
        obs.on_first_subscriber(move || sink.set(probe.subscriber_count()));
        let _sub = obs.subscribe(|_| {});
        assert_eq!(seen.get(), 0);
    }

    #[test]
    fn reentrant_set_from_subscriber() {
        let obs = Observable::new(0);
        let writer = obs.clone();
        let _sub = obs.subscribe(move |v| {
            if *v < 3 {
                writer.set(v + 1);
            }
        });
        obs.set(1);
        assert_eq!(obs.get(), 3);
    }

    #[test]
    fn clones_share_state_and_subscribers() {
        let a = Observable::new(0);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        let (count, cb) = counter();
        let _sub = a.subscribe(cb);
        b.set(7);
        assert_eq!(a.get(), 7);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn debug_format() {
        let obs = Observable::new(42);
        let dbg = format!("{obs:?}");
        assert!(dbg.contains("Observable"));
        assert!(dbg.contains("42"));
    }
}
