#![forbid(unsafe_code)]

//! Test harness for knobs.
//!
//! - [`recording`]: a [`SurfaceHost`](knobs_runtime::SurfaceHost) that logs
//!   every mount, update, and destroy, and keeps the stores it was last
//!   handed so tests can edit them the way a real surface would.
//! - [`outline`]: deterministic text rendering of registered panels.
//! - [`golden`]: BLAKE3 checksums of outlines, golden files, and a JSONL
//!   run log.

pub mod golden;
pub mod outline;
pub mod recording;

pub use golden::{GoldenLogger, GoldenOutcome, compute_text_checksum, verify_checksums};
pub use outline::{format_value, render_outline};
pub use recording::{RecordingHost, SurfaceEvent, SurfaceLog};
