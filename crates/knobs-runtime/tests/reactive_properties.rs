//! Property invariants for observable stores and batch coalescing.

use std::cell::RefCell;
use std::rc::Rc;

use knobs_runtime::{BatchScope, NotifyPolicy, Observable};
use proptest::prelude::*;

fn recorded(obs: &Observable<i32>) -> (Rc<RefCell<Vec<i32>>>, knobs_runtime::Subscription) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let sub = obs.subscribe(move |v| sink.borrow_mut().push(*v));
    (seen, sub)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn on_change_publishes_each_distinct_write(writes in prop::collection::vec(0i32..4, 0..40)) {
        let obs = Observable::new(0);
        let (seen, _sub) = recorded(&obs);
        let mut expected = Vec::new();
        let mut current = 0;
        for w in writes {
            obs.set(w);
            if w != current {
                expected.push(w);
                current = w;
            }
        }
        prop_assert_eq!(&*seen.borrow(), &expected);
        prop_assert_eq!(obs.version(), expected.len() as u64);
    }

    #[test]
    fn always_publishes_every_write(writes in prop::collection::vec(0i32..4, 0..40)) {
        let obs = Observable::with_policy(0, NotifyPolicy::Always);
        let (seen, _sub) = recorded(&obs);
        for &w in &writes {
            obs.set(w);
        }
        prop_assert_eq!(&*seen.borrow(), &writes);
    }

    #[test]
    fn batch_delivers_latest_value_once(writes in prop::collection::vec(1i32..100, 1..20)) {
        let obs = Observable::with_policy(0, NotifyPolicy::Always);
        let (seen, _sub) = recorded(&obs);
        {
            let _batch = BatchScope::new();
            for &w in &writes {
                obs.set(w);
            }
            prop_assert!(seen.borrow().is_empty());
        }
        prop_assert_eq!(&*seen.borrow(), &vec![*writes.last().unwrap_or(&0)]);
    }

    #[test]
    fn hooks_track_subscriber_count(ops in prop::collection::vec(any::<bool>(), 0..40)) {
        let obs = Observable::new(0);
        let active = Rc::new(RefCell::new(false));
        let (on, off) = (Rc::clone(&active), Rc::clone(&active));
        obs.on_first_subscriber(move || *on.borrow_mut() = true);
        obs.on_last_unsubscribe(move || *off.borrow_mut() = false);

        let mut subs = Vec::new();
        for subscribe in ops {
            if subscribe {
                subs.push(obs.subscribe(|_| {}));
            } else {
                subs.pop();
            }
            prop_assert_eq!(*active.borrow(), !subs.is_empty());
            prop_assert_eq!(obs.subscriber_count(), subs.len());
        }
    }
}
