#![forbid(unsafe_code)]

//! Structured logging emitted by panel synchronization.
//!
//! Verifies the `knobs.sync` span names and `direction` fields, and that a
//! re-entrant `set` is reported at `warn`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use knobs_core::{NodePath, Value};
use knobs_runtime::{Panel, Registry};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ============================================================================
// Capture layer
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    message: String,
}

#[derive(Default, Clone)]
struct Capture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl Capture {
    fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn directions(&self) -> Vec<String> {
        self.spans()
            .into_iter()
            .filter(|s| s.name == "knobs.sync")
            .filter_map(|s| s.fields.get("direction").cloned())
            .collect()
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for Capture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let message = visitor
            .0
            .into_iter()
            .find(|(k, _)| k == "message")
            .map(|(_, v)| v)
            .unwrap_or_default();
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message,
        });
    }
}

fn with_captured_tracing<R>(f: impl FnOnce() -> R) -> (R, Capture) {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn external_set_opens_one_sync_span() {
    let ((), capture) = with_captured_tracing(|| {
        let registry = Registry::new();
        let panel = Panel::with_registry(&Value::object([("x", 1)]), &registry).expect("valid");
        let _sub = panel.subscribe(|_| {});
        panel.set(Value::object([("x", 2)]));
    });
    assert_eq!(capture.directions(), vec!["external_to_internal"]);
    assert!(capture.spans().iter().any(|s| s.name == "knobs.store.notify"));
}

#[test]
fn node_write_opens_internal_sync_span() {
    let ((), capture) = with_captured_tracing(|| {
        let registry = Registry::new();
        let panel = Panel::with_registry(&Value::object([("x", 1)]), &registry).expect("valid");
        let _sub = panel.subscribe(|_| {});
        let mut tree = panel.nodes().get();
        tree.set_leaf_value(&NodePath::from("x"), &Value::from(9));
        panel.nodes().set(tree);
    });
    assert_eq!(capture.directions(), vec!["internal_to_external"]);
}

#[test]
fn reentrant_set_is_warned() {
    let ((), capture) = with_captured_tracing(|| {
        let registry = Registry::new();
        let panel = Panel::with_registry(&Value::object([("x", 1)]), &registry).expect("valid");
        let armed = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&armed);
        let inner = panel.clone();
        let _sub = panel.subscribe(move |_| {
            if *flag.borrow() {
                inner.set(Value::object([("x", 0)]));
            }
        });
        *armed.borrow_mut() = true;
        panel.set(Value::object([("x", 2)]));
        assert_eq!(panel.get(), Value::object([("x", 2)]));
    });
    let warned: Vec<CapturedEvent> = capture
        .events()
        .into_iter()
        .filter(|e| e.level == tracing::Level::WARN)
        .collect();
    assert_eq!(warned.len(), 1, "{warned:?}");
    assert!(warned[0].message.contains("re-entrant"));
}
