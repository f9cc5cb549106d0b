#![forbid(unsafe_code)]

//! Batch coalescing for [`Observable`](super::Observable) notifications.
//!
//! Writing several stores in a row normally fans out one notification per
//! write. Inside a [`BatchScope`] the writes still land immediately but the
//! notifications are queued, and each subscriber runs at most once, with the
//! latest value, when the outermost scope exits.
//!
//! ```ignore
//! use knobs_runtime::reactive::{BatchScope, Observable};
//!
//! let width = Observable::new(1.0);
//! let height = Observable::new(1.0);
//! {
//!     let _batch = BatchScope::new();
//!     width.set(2.0);
//!     height.set(3.0);
//!     width.set(4.0);
//! } // width subscribers see 4.0 once, height subscribers see 3.0 once
//! ```
//!
//! # Invariants
//!
//! 1. Nested scopes are allowed; only the outermost one flushes.
//! 2. `get()` inside a batch returns the latest written value.
//! 3. Flushed callbacks run in the order their key was first queued.
//!
//! # Failure Modes
//!
//! - **Callback panics during flush**: the remaining callbacks still run and
//!   the first panic is resumed afterwards.

use std::cell::RefCell;
use tracing::{debug_span, trace};
use web_time::Instant;

type Deferred = Box<dyn FnOnce()>;

struct Queued {
    key: Option<usize>,
    run: Deferred,
}

struct BatchState {
    depth: u32,
    queue: Vec<Queued>,
    writes: u64,
}

thread_local! {
    static BATCH: RefCell<Option<BatchState>> = const { RefCell::new(None) };
}

/// Whether a batch is open on this thread.
pub fn is_batching() -> bool {
    BATCH.with(|state| state.borrow().is_some())
}

/// Queue `f` for the end of the current batch, or run it now if none is open.
///
/// Returns `true` if `f` was queued.
pub fn defer_or_run(f: impl FnOnce() + 'static) -> bool {
    enqueue(None, Box::new(f))
}

/// Like [`defer_or_run`], but a later call with the same `key` replaces the
/// queued callback while keeping its queue position.
pub fn defer_or_run_keyed(key: usize, f: impl FnOnce() + 'static) -> bool {
    enqueue(Some(key), Box::new(f))
}

fn enqueue(key: Option<usize>, run: Deferred) -> bool {
    let run = BATCH.with(|state| {
        let mut guard = state.borrow_mut();
        let Some(batch) = guard.as_mut() else {
            return Some(run);
        };
        match key.and_then(|k| batch.queue.iter_mut().find(|q| q.key == Some(k))) {
            Some(queued) => queued.run = run,
            None => batch.queue.push(Queued { key, run }),
        }
        None
    });
    match run {
        Some(run) => {
            run();
            false
        }
        None => true,
    }
}

/// Count a store write against the open batch, if any.
pub(crate) fn record_write() {
    BATCH.with(|state| {
        if let Some(batch) = state.borrow_mut().as_mut() {
            batch.writes = batch.writes.saturating_add(1);
        }
    });
}

fn flush() {
    let (writes, queue) = BATCH.with(|state| match state.borrow_mut().as_mut() {
        Some(batch) => (
            std::mem::take(&mut batch.writes),
            std::mem::take(&mut batch.queue),
        ),
        None => (0, Vec::new()),
    });
    if queue.is_empty() {
        return;
    }

    let callbacks = queue.len() as u64;
    let start = Instant::now();
    let _span = debug_span!("knobs.batch.flush", writes, callbacks).entered();

    let mut first_panic: Option<Box<dyn std::any::Any + Send>> = None;
    for queued in queue {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(queued.run));
        if let Err(payload) = result
            && first_panic.is_none()
        {
            first_panic = Some(payload);
        }
    }

    trace!(
        duration_us = start.elapsed().as_micros() as u64,
        writes, callbacks, "batch flushed"
    );

    if let Some(payload) = first_panic {
        std::panic::resume_unwind(payload);
    }
}

/// RAII guard holding a batch open.
///
/// While any `BatchScope` is alive, observable notifications on this thread
/// are queued. Dropping the outermost scope flushes the queue.
pub struct BatchScope {
    is_root: bool,
}

impl BatchScope {
    /// Open (or nest into) a batch.
    #[must_use]
    pub fn new() -> Self {
        let is_root = BATCH.with(|state| {
            let mut guard = state.borrow_mut();
            match guard.as_mut() {
                Some(batch) => {
                    batch.depth += 1;
                    false
                }
                None => {
                    *guard = Some(BatchState {
                        depth: 1,
                        queue: Vec::new(),
                        writes: 0,
                    });
                    true
                }
            }
        });
        Self { is_root }
    }

    /// Callbacks currently queued.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        BATCH.with(|state| state.borrow().as_ref().map_or(0, |b| b.queue.len()))
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let outermost = BATCH.with(|state| {
            state.borrow_mut().as_mut().is_some_and(|batch| {
                batch.depth -= 1;
                batch.depth == 0
            })
        });
        if outermost {
            flush();
            BATCH.with(|state| *state.borrow_mut() = None);
        }
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("is_root", &self.is_root)
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Observable;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn batch_coalesces_to_final_value() {
        let obs = Observable::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = obs.subscribe(move |v| sink.borrow_mut().push(*v));

        {
            let _batch = BatchScope::new();
            obs.set(1);
            obs.set(2);
            obs.set(3);
            assert!(seen.borrow().is_empty());
            assert_eq!(obs.get(), 3);
        }
        assert_eq!(*seen.borrow(), vec![3]);
    }

    #[test]
    fn only_outermost_scope_flushes() {
        let obs = Observable::new(0);
        let count = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&count);
        let _sub = obs.subscribe(move |_| counter.set(counter.get() + 1));

        {
            let _outer = BatchScope::new();
            {
                let _inner = BatchScope::new();
                obs.set(1);
            }
            assert_eq!(count.get(), 0);
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn is_batching_tracks_scope() {
        assert!(!is_batching());
        {
            let _batch = BatchScope::default();
            assert!(is_batching());
        }
        assert!(!is_batching());
    }

    #[test]
    fn defer_or_run_runs_immediately_outside_batch() {
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        assert!(!defer_or_run(move || flag.set(true)));
        assert!(ran.get());
    }

    #[test]
    fn keyed_callbacks_replace_in_place() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let (a, b, c) = (Rc::clone(&order), Rc::clone(&order), Rc::clone(&order));
        {
            let batch = BatchScope::new();
            assert!(defer_or_run_keyed(1, move || a.borrow_mut().push("one-old")));
            assert!(defer_or_run_keyed(2, move || b.borrow_mut().push("two")));
            assert!(defer_or_run_keyed(1, move || c.borrow_mut().push("one-new")));
            assert_eq!(batch.pending_count(), 2);
        }
        assert_eq!(*order.borrow(), vec!["one-new", "two"]);
    }

    #[test]
    fn stores_without_subscribers_queue_nothing() {
        let obs = Observable::new(0);
        let batch = BatchScope::new();
        obs.set(42);
        assert_eq!(batch.pending_count(), 0);
    }
}
