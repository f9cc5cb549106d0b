#![forbid(unsafe_code)]

//! Golden checksums of surface outlines.
//!
//! Each case drives a panel through a fixed sequence and checksums every
//! outline the recording surface received. Rendering must be deterministic:
//! the same sequence always yields the same checksums.
//!
//! ```sh
//! BLESS=1 cargo test -p knobs-harness --test golden_outline
//! ```

use std::path::Path;

use knobs_core::Value;
use knobs_harness::golden::{
    GoldenLogger, GoldenOutcome, compute_text_checksum, golden_checksum_path, is_bless_mode,
    load_golden_checksums, save_golden_checksums, verify_checksums,
};
use knobs_harness::{RecordingHost, SurfaceEvent, SurfaceLog};
use knobs_runtime::{Panel, Registry, controls};

fn tuning_input() -> Value {
    Value::object([
        ("speed", Value::from(5)),
        (
            "camera",
            Value::object([
                ("$title", Value::from("Camera")),
                (
                    "fov",
                    Value::object([
                        ("value", Value::from(60)),
                        ("min", Value::from(10)),
                        ("max", Value::from(120)),
                    ]),
                ),
                ("tint", Value::from("#336699")),
            ]),
        ),
        ("paused", Value::from(false)),
    ])
}

/// Run the scripted session and return the outlines it rendered.
fn run_script() -> Vec<String> {
    let log = SurfaceLog::new();
    let registry = Registry::new();
    registry.install_host(RecordingHost::new(&log));

    let panel = Panel::with_registry(&tuning_input(), &registry).expect("valid");
    let sub = panel.subscribe(|_| {});

    panel.update(|v| {
        let mut next = v.clone();
        if let Some(map) = next.as_object_mut() {
            map.insert("paused", Value::from(true));
        }
        next
    });
    let stores = log.stores();
    controls(&stores[0])[1].write(&Value::from(75));
    registry.refresh();
    drop(sub);

    log.events()
        .into_iter()
        .filter_map(|e| match e {
            SurfaceEvent::Update { outline, .. } => Some(outline),
            _ => None,
        })
        .collect()
}

#[test]
fn outlines_are_deterministic() {
    let first: Vec<String> = run_script().iter().map(|o| compute_text_checksum(o)).collect();
    let second: Vec<String> = run_script().iter().map(|o| compute_text_checksum(o)).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn edited_values_show_in_outline() {
    let outlines = run_script();
    let refreshed = &outlines[2];
    assert!(refreshed.contains("  Camera/\n    fov [range 10..120] = 75\n"), "{refreshed}");
    assert!(refreshed.contains("paused [boolean] = true"), "{refreshed}");
    assert_eq!(outlines[3], "");
}

#[test]
fn golden_outline_checksums() {
    let outlines = run_script();
    let mut logger = GoldenLogger::noop();
    logger.log_start("tuning_session");
    for (frame_id, outline) in (0u32..).zip(&outlines) {
        let panels = outline.matches("panel ").count();
        logger.log_frame(frame_id, panels, &compute_text_checksum(outline));
    }

    let path = golden_checksum_path(Path::new(env!("CARGO_MANIFEST_DIR")), "tuning_session");
    if is_bless_mode() {
        save_golden_checksums(&path, logger.checksums()).expect("bless golden file");
        logger.log_complete(GoldenOutcome::Pass);
        return;
    }

    let expected = load_golden_checksums(&path).expect("read golden file");
    assert_eq!(expected.len(), 4, "golden file missing at {}", path.display());
    let (outcome, mismatch) = verify_checksums(logger.checksums(), &expected);
    logger.log_complete(outcome);
    assert_eq!(
        outcome,
        GoldenOutcome::Pass,
        "golden mismatch at {mismatch:?}; rerun with BLESS=1 if the change is intended"
    );
}
