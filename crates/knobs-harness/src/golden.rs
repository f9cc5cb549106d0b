#![forbid(unsafe_code)]

//! Golden outline checksums.
//!
//! Each scenario renders a sequence of outlines (one per surface update).
//! Their BLAKE3 checksums are compared with a checked-in golden file:
//!
//! ```text
//! tests/golden/<scenario>.checksums
//! ```
//!
//! Set `BLESS=1` to rewrite golden files from the current output. Missing
//! golden files pass unless `KNOBS_GOLDEN_ENFORCE=1` or `CI=1`.
//!
//! # JSONL Schema
//!
//! [`GoldenLogger`] writes one JSON object per line:
//!
//! ```json
//! {"event":"start","run_id":"...","case":"scenario_a"}
//! {"event":"frame","run_id":"...","frame_id":0,"panels":1,"checksum":"blake3:..."}
//! {"event":"complete","run_id":"...","outcome":"pass","checksums":["blake3:..."],"total_ms":3}
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde_json::json;

const CHECKSUM_PREFIX: &str = "blake3:";

/// BLAKE3 checksum of `text`, prefixed with `blake3:`.
#[must_use]
pub fn compute_text_checksum(text: &str) -> String {
    format!("{CHECKSUM_PREFIX}{}", blake3::hash(text.as_bytes()).to_hex())
}

/// Outcome of a golden comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoldenOutcome {
    Pass,
    Fail,
    Skip,
}

impl GoldenOutcome {
    /// Lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
        }
    }
}

/// JSONL event logger for golden runs.
pub struct GoldenLogger {
    writer: Option<BufWriter<File>>,
    run_id: String,
    start_time: Instant,
    checksums: Vec<String>,
}

impl GoldenLogger {
    /// Logger appending to `path`.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            run_id: generate_run_id(),
            start_time: Instant::now(),
            checksums: Vec::new(),
        })
    }

    /// Logger that only collects checksums.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            writer: None,
            run_id: generate_run_id(),
            start_time: Instant::now(),
            checksums: Vec::new(),
        }
    }

    pub fn log_start(&mut self, case: &str) {
        let line = json!({ "event": "start", "run_id": self.run_id, "case": case });
        self.write_line(&line);
    }

    /// Record one rendered outline.
    pub fn log_frame(&mut self, frame_id: u32, panels: usize, checksum: &str) {
        self.checksums.push(checksum.to_owned());
        let line = json!({
            "event": "frame",
            "run_id": self.run_id,
            "frame_id": frame_id,
            "panels": panels,
            "checksum": checksum,
        });
        self.write_line(&line);
    }

    pub fn log_complete(&mut self, outcome: GoldenOutcome) {
        let line = json!({
            "event": "complete",
            "run_id": self.run_id,
            "outcome": outcome.as_str(),
            "checksums": self.checksums,
            "total_ms": self.start_time.elapsed().as_millis() as u64,
        });
        self.write_line(&line);
    }

    /// Checksums logged so far.
    #[must_use]
    pub fn checksums(&self) -> &[String] {
        &self.checksums
    }

    fn write_line(&mut self, line: &serde_json::Value) {
        if let Some(ref mut writer) = self.writer {
            let _ = writeln!(writer, "{line}");
            let _ = writer.flush();
        }
    }
}

fn generate_run_id() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{timestamp:x}")
}

/// Path of the golden file for a scenario.
#[must_use]
pub fn golden_checksum_path(base_dir: &Path, scenario: &str) -> PathBuf {
    base_dir
        .join("tests")
        .join("golden")
        .join(format!("{scenario}.checksums"))
}

/// Expected checksums from a golden file. A missing file yields none.
pub fn load_golden_checksums(path: &Path) -> std::io::Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_owned)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Write a golden file.
pub fn save_golden_checksums(path: &Path, checksums: &[String]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = format!(
        "# Golden checksums - do not edit manually\n{}\n",
        checksums.join("\n")
    );
    fs::write(path, content)
}

/// Whether golden files should be rewritten.
#[must_use]
pub fn is_bless_mode() -> bool {
    env_flag("BLESS")
}

/// Whether a missing golden file is a failure.
#[must_use]
pub fn is_golden_enforced() -> bool {
    env_flag("KNOBS_GOLDEN_ENFORCE") || env_flag("CI")
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Compare checksums. Returns the outcome and the first mismatching index.
#[must_use]
pub fn verify_checksums(actual: &[String], expected: &[String]) -> (GoldenOutcome, Option<usize>) {
    if expected.is_empty() {
        let outcome = if is_golden_enforced() {
            GoldenOutcome::Fail
        } else {
            GoldenOutcome::Skip
        };
        return (outcome, None);
    }
    if let Some(index) = actual.iter().zip(expected).position(|(a, e)| a != e) {
        return (GoldenOutcome::Fail, Some(index));
    }
    if actual.len() != expected.len() {
        return (GoldenOutcome::Fail, None);
    }
    (GoldenOutcome::Pass, None)
}
