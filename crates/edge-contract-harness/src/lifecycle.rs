// crates/edge-contract-harness/src/lifecycle.rs
// ============================================================================
// Module: Lifecycle Orchestrator
// Description: Deployment guard, module isolation, and polling helpers.
// Purpose: Guarantee destroy after apply, even when a test panics.
// Dependencies: edge-contract-core, rand, tempfile
// ============================================================================

//! ## Overview
//! [`Deployment`] is returned by a successful apply and destroys the
//! deployment when dropped unless [`Deployment::teardown`] already ran.
//! Explicit teardown also verifies `tofu state list` is empty.
//! [`copy_module_to_temp`] isolates `.terraform` state per test, and
//! [`wait_until`] replaces fixed sleeps with bounded polling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use edge_contract_core::AssertionOutcome;
use edge_contract_core::Checks;
use edge_contract_core::Outputs;
use edge_contract_core::PlanIndex;
use rand::Rng;
use tempfile::TempDir;

use crate::error::HarnessError;
use crate::events::EventOutcome;
use crate::invoker::CommandOutput;
use crate::tofu::Initialized;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters used for unique suffixes (valid in GCP resource names).
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of unique suffixes.
const ID_LENGTH: usize = 6;

/// Directory names never copied into scratch module trees.
const SKIPPED_DIRS: [&str; 2] = [".terraform", ".git"];

// ============================================================================
// SECTION: Deployment Guard
// ============================================================================

/// Applied infrastructure that is destroyed when the guard goes away.
pub struct Deployment<'a> {
    /// Workspace that applied the plan.
    workspace: &'a Initialized,
    /// Plan used for the apply.
    plan: PlanIndex,
    /// Set once destroy has been attempted.
    released: bool,
}

impl<'a> Deployment<'a> {
    /// Wraps an applied workspace.
    pub(crate) fn new(workspace: &'a Initialized, plan: PlanIndex) -> Self {
        workspace.record("deployment", EventOutcome::Started, "apply completed");
        Self {
            workspace,
            plan,
            released: false,
        }
    }

    /// Returns the plan that was applied.
    #[must_use]
    pub const fn plan(&self) -> &PlanIndex {
        &self.plan
    }

    /// Returns the workspace.
    #[must_use]
    pub const fn workspace(&self) -> &'a Initialized {
        self.workspace
    }

    /// Reads `tofu output -json`.
    ///
    /// # Errors
    ///
    /// Returns an error when outputs cannot be read.
    pub fn output(&self) -> Result<Outputs, HarnessError> {
        self.workspace.output()
    }

    /// Lists resources in state.
    ///
    /// # Errors
    ///
    /// Returns an error when the state cannot be listed.
    pub fn state_list(&self) -> Result<Vec<String>, HarnessError> {
        self.workspace.state_list()
    }

    /// Destroys the deployment and verifies the state is empty.
    ///
    /// # Errors
    ///
    /// Returns an error when destroy fails or resources remain in state.
    pub fn teardown(mut self) -> Result<CommandOutput, HarnessError> {
        self.released = true;
        let output = self.workspace.destroy()?;
        let remaining = self.workspace.state_list()?;
        let outcome = if remaining.is_empty() {
            AssertionOutcome::Pass
        } else {
            AssertionOutcome::fail(format!(
                "{} resources remain in state: {}",
                remaining.len(),
                remaining.join(", ")
            ))
        };
        let mut checks = Checks::new("teardown");
        checks.check("state list is empty after destroy", outcome);
        checks.finish()?;
        self.workspace.record("deployment", EventOutcome::Ok, "teardown verified");
        Ok(output)
    }
}

impl Drop for Deployment<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let context = if thread::panicking() { "destroy during panic" } else { "destroy on drop" };
        match self.workspace.destroy() {
            Ok(_) => self.workspace.record("deployment", EventOutcome::Ok, context),
            Err(err) => self.workspace.record(
                "deployment",
                EventOutcome::Failed,
                &format!("{context} failed: {err}"),
            ),
        }
    }
}

// ============================================================================
// SECTION: Module Isolation
// ============================================================================

/// A module copied into a scratch directory.
#[derive(Debug)]
pub struct ModuleCopy {
    /// Scratch directory; removed on drop.
    root: TempDir,
    /// Copied module path.
    path: PathBuf,
}

impl ModuleCopy {
    /// Returns the copied module directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the scratch root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }
}

/// Copies `dir` into a unique scratch directory, skipping `.terraform`.
///
/// # Errors
///
/// Returns an error when `dir` is missing or a file cannot be copied.
pub fn copy_module_to_temp(dir: &Path, label: &str) -> Result<ModuleCopy, HarnessError> {
    if !dir.is_dir() {
        return Err(HarnessError::precondition(format!(
            "module directory {} does not exist",
            dir.display()
        )));
    }
    let root = tempfile::Builder::new()
        .prefix(&format!("edge-contract-{label}-{}-", unique_id()))
        .tempdir()?;
    let name = dir.file_name().map_or_else(|| "module".into(), ToOwned::to_owned);
    let path = root.path().join(name);
    copy_tree(dir, &path)?;
    Ok(ModuleCopy {
        root,
        path,
    })
}

/// Recursively copies a directory tree.
fn copy_tree(source: &Path, target: &Path) -> Result<(), HarnessError> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let from = entry.path();
        let name = entry.file_name();
        let to = target.join(&name);
        if fs::metadata(&from)?.is_dir() {
            if SKIPPED_DIRS.iter().any(|skipped| name == *skipped) {
                continue;
            }
            copy_tree(&from, &to)?;
        } else if !is_local_state(&name.to_string_lossy()) {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

/// Returns true for local state files and their backups.
fn is_local_state(name: &str) -> bool {
    name.starts_with("terraform.tfstate") || name.ends_with(".tfplan")
}

// ============================================================================
// SECTION: Identifiers and Polling
// ============================================================================

/// Returns a short lowercase alphanumeric suffix for resource names.
#[must_use]
pub fn unique_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LENGTH).map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())])).collect()
}

/// Polls `probe` every `interval` until it yields a value or `deadline`
/// elapses.
///
/// `probe` returns `Ok(Some(value))` when ready, `Ok(None)` to keep waiting,
/// and `Err` to stop immediately.
///
/// # Errors
///
/// Returns [`HarnessError::Timeout`] when the deadline elapses, or the
/// probe's error.
pub fn wait_until<T>(
    what: &str,
    deadline: Duration,
    interval: Duration,
    mut probe: impl FnMut() -> Result<Option<T>, HarnessError>,
) -> Result<T, HarnessError> {
    let started = Instant::now();
    loop {
        if let Some(value) = probe()? {
            return Ok(value);
        }
        let waited = started.elapsed();
        if waited >= deadline {
            return Err(HarnessError::Timeout {
                what: what.to_string(),
                waited,
                partial: None,
            });
        }
        thread::sleep(interval.min(deadline.saturating_sub(waited)));
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
