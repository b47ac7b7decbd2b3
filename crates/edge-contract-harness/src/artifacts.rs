// crates/edge-contract-harness/src/artifacts.rs
// ============================================================================
// Module: Run Artifacts
// Description: Per-test run roots with canonical JSON summaries.
// Purpose: Leave a deterministic record of every contract run.
// Dependencies: edge-contract-config, edge-contract-core, serde, serde_jcs
// ============================================================================

//! ## Overview
//! Each test gets a run root under `target/edge-contract/run_<ms>/<test>`
//! (or under `EDGE_CONTRACT_RUN_ROOT`). [`TestReporter`] writes
//! `summary.json` (JCS canonical JSON) and `summary.md` when finished, and
//! still writes a `panic` summary from `Drop` when a test aborts early.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use edge_contract_config::HarnessEnv;
use edge_contract_config::HarnessEnvConfig;
use edge_contract_core::CheckRecord;
use edge_contract_core::Checks;
use serde::Serialize;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default parent directory for run roots.
pub const DEFAULT_ARTIFACT_ROOT: &str = "target/edge-contract";

// ============================================================================
// SECTION: Artifacts
// ============================================================================

/// Artifact directory for one test.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    /// Run root.
    root: PathBuf,
}

impl RunArtifacts {
    /// Creates the run root for `test_name` using environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error when the environment is invalid or the directory
    /// cannot be created.
    pub fn new(test_name: &str) -> Result<Self, HarnessError> {
        let env = HarnessEnvConfig::load().map_err(HarnessError::Precondition)?;
        Self::with_env(test_name, &env)
    }

    /// Creates the run root for `test_name` from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Precondition`] when an overridden root is
    /// already populated and overwrite is not allowed, or an I/O error.
    pub fn with_env(test_name: &str, env: &HarnessEnvConfig) -> Result<Self, HarnessError> {
        let root = match &env.run_root {
            Some(base) => base.join(test_name),
            None => PathBuf::from(DEFAULT_ARTIFACT_ROOT)
                .join(format!("run_{}", now_millis()))
                .join(test_name),
        };
        if !env.allow_overwrite && is_populated(&root)? {
            return Err(HarnessError::precondition(format!(
                "run root {} already has artifacts; set {}=1 to reuse it",
                root.display(),
                HarnessEnv::AllowOverwrite.as_str()
            )));
        }
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
        })
    }

    /// Returns the run root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a JSON artifact using canonical JCS serialization.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the write fails.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, HarnessError> {
        let path = self.root.join(name);
        let bytes = serde_jcs::to_vec(value).map_err(|err| std::io::Error::other(err.to_string()))?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Writes a UTF-8 text artifact.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    pub fn write_text(&self, name: &str, value: &str) -> Result<PathBuf, HarnessError> {
        let path = self.root.join(name);
        fs::write(&path, value.as_bytes())?;
        Ok(path)
    }
}

/// Returns true when `dir` exists and has entries.
fn is_populated(dir: &Path) -> Result<bool, HarnessError> {
    if !dir.is_dir() {
        return Ok(false);
    }
    Ok(fs::read_dir(dir)?.next().is_some())
}

/// Milliseconds since the Unix epoch.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Reporter
// ============================================================================

/// Final status of a reported test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Every check passed.
    Passed,
    /// At least one check failed.
    Failed,
    /// The test panicked before finishing.
    Panic,
    /// The test ended without an explicit status.
    Unknown,
}

impl ReportStatus {
    /// Returns the label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Panic => "panic",
            Self::Unknown => "unknown",
        }
    }
}

/// Serialized test summary.
#[derive(Debug, Serialize)]
struct TestSummary {
    /// Test name.
    test_name: String,
    /// Final status.
    status: ReportStatus,
    /// Start time (ms since epoch).
    started_at_ms: u128,
    /// End time (ms since epoch).
    ended_at_ms: u128,
    /// Duration in milliseconds.
    duration_ms: u128,
    /// Free-form notes.
    notes: Vec<String>,
    /// Recorded check outcomes.
    checks: Vec<CheckRecord>,
    /// Artifact file names.
    artifacts: Vec<String>,
}

/// Writes summaries even when a test panics.
pub struct TestReporter {
    /// Artifact directory.
    artifacts: RunArtifacts,
    /// Test name.
    test_name: String,
    /// Start time.
    started_at_ms: u128,
    /// Notes gathered during the run.
    notes: Vec<String>,
    /// Check outcomes gathered during the run.
    checks: Vec<CheckRecord>,
    /// Artifact names gathered during the run.
    files: Vec<String>,
    /// Set once a summary was written.
    finalized: bool,
}

impl TestReporter {
    /// Creates a reporter for `test_name`.
    ///
    /// # Errors
    ///
    /// Returns an error when the run root cannot be created.
    pub fn new(test_name: &str) -> Result<Self, HarnessError> {
        Ok(Self::with_artifacts(test_name, RunArtifacts::new(test_name)?))
    }

    /// Creates a reporter over existing artifacts.
    #[must_use]
    pub fn with_artifacts(test_name: &str, artifacts: RunArtifacts) -> Self {
        Self {
            artifacts,
            test_name: test_name.to_string(),
            started_at_ms: now_millis(),
            notes: Vec::new(),
            checks: Vec::new(),
            files: Vec::new(),
            finalized: false,
        }
    }

    /// Returns the artifact manager.
    #[must_use]
    pub const fn artifacts(&self) -> &RunArtifacts {
        &self.artifacts
    }

    /// Adds a note.
    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Adds the outcomes of a check accumulator.
    pub fn record_checks(&mut self, checks: &Checks) {
        self.checks.extend(checks.records().iter().cloned());
    }

    /// Writes a JSON artifact and lists it in the summary.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    pub fn attach_json<T: Serialize>(&mut self, name: &str, value: &T) -> Result<(), HarnessError> {
        self.artifacts.write_json(name, value)?;
        self.files.push(name.to_string());
        Ok(())
    }

    /// Writes a text artifact and lists it in the summary.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    pub fn attach_text(&mut self, name: &str, value: &str) -> Result<(), HarnessError> {
        self.artifacts.write_text(name, value)?;
        self.files.push(name.to_string());
        Ok(())
    }

    /// Writes `summary.json` and `summary.md`.
    ///
    /// # Errors
    ///
    /// Returns an error when a summary cannot be written.
    pub fn finish(&mut self, status: ReportStatus) -> Result<(), HarnessError> {
        let ended_at_ms = now_millis();
        let summary = TestSummary {
            test_name: self.test_name.clone(),
            status,
            started_at_ms: self.started_at_ms,
            ended_at_ms,
            duration_ms: ended_at_ms.saturating_sub(self.started_at_ms),
            notes: self.notes.clone(),
            checks: self.checks.clone(),
            artifacts: self.files.clone(),
        };
        self.artifacts.write_json("summary.json", &summary)?;
        self.artifacts.write_text("summary.md", &summary_markdown(&summary))?;
        self.finalized = true;
        Ok(())
    }
}

impl Drop for TestReporter {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        let status =
            if std::thread::panicking() { ReportStatus::Panic } else { ReportStatus::Unknown };
        self.notes.push("test terminated without explicit summary".to_string());
        let _ = self.finish(status);
    }
}

/// Renders the Markdown summary.
fn summary_markdown(summary: &TestSummary) -> String {
    let mut out = String::from("# Contract Run Summary\n\n## Status\n\n");
    let _ = writeln!(out, "- Test: {}", summary.test_name);
    let _ = writeln!(out, "- Status: {}", summary.status.as_str());
    let _ = writeln!(out, "- Duration (ms): {}", summary.duration_ms);
    out.push_str("\n## Checks\n\n");
    if summary.checks.is_empty() {
        out.push_str("- None\n");
    }
    for record in &summary.checks {
        let label = record.outcome.label();
        match record.outcome.message() {
            None => {
                let _ = writeln!(out, "- {label} {}", record.label);
            }
            Some(message) => {
                let _ = writeln!(out, "- {label} {}: {message}", record.label);
            }
        }
    }
    push_list(&mut out, "Notes", &summary.notes);
    push_list(&mut out, "Artifacts", &summary.artifacts);
    out
}

/// Appends a titled bullet list.
fn push_list(out: &mut String, title: &str, items: &[String]) {
    let _ = write!(out, "\n## {title}\n\n");
    if items.is_empty() {
        out.push_str("- None\n");
    }
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
