// crates/edge-contract-harness/src/checkov.rs
// ============================================================================
// Module: Checkov Runner
// Description: Runs Checkov over a module tree and buckets its findings.
// Purpose: Gate on static-analysis severity without re-implementing rules.
// Dependencies: edge-contract-core, edge-contract-config
// ============================================================================

//! ## Overview
//! Checkov exits 1 when it finds failed checks; that is still a usable
//! report, so only other non-zero codes (or unparseable output) are errors.
//! [`CheckovScan::gate`] applies the configured `fail_on` threshold.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use edge_contract_config::CheckovConfig;
use edge_contract_core::AssertionOutcome;
use edge_contract_core::Severity;
use edge_contract_core::ThreatReport;

use crate::error::HarnessError;
use crate::error::ToolFailure;
use crate::invoker::CommandSpec;
use crate::invoker::Invoker;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code Checkov uses when checks failed.
const FINDINGS_EXIT_CODE: i32 = 1;

/// Output fragments that indicate a tool-level error rather than findings.
const TOOL_ERROR_MARKERS: [&str; 2] = ["Traceback (most recent call last)", "[ERROR]"];

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Result of one Checkov run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckovScan {
    /// Bucketed findings.
    pub report: ThreatReport,
    /// Severity at or above which the gate fails.
    pub fail_on: Severity,
    /// Raw stderr (diagnostics).
    pub diagnostics: String,
}

impl CheckovScan {
    /// Returns the gate outcome for the configured threshold.
    #[must_use]
    pub fn gate(&self) -> AssertionOutcome {
        let count = self.report.count_at_least(self.fail_on);
        if count == 0 {
            AssertionOutcome::Pass
        } else {
            AssertionOutcome::fail(format!(
                "{count} findings at or above {} severity",
                self.fail_on.as_str()
            ))
        }
    }

    /// Returns a failure when diagnostics show a tool-level error.
    #[must_use]
    pub fn tool_error_outcome(&self) -> AssertionOutcome {
        TOOL_ERROR_MARKERS
            .iter()
            .find(|marker| self.diagnostics.contains(**marker))
            .map_or(AssertionOutcome::Pass, |marker| {
                AssertionOutcome::fail(format!("checkov reported a tool error ({marker})"))
            })
    }
}

/// Builds the Checkov command for `dir`.
#[must_use]
pub fn checkov_command(config: &CheckovConfig, dir: &Path) -> CommandSpec {
    CommandSpec::new(config.binary.clone()).args([
        "--directory".to_string(),
        dir.display().to_string(),
        "--framework".to_string(),
        config.framework.clone(),
        "--quiet".to_string(),
        "--compact".to_string(),
        "--output".to_string(),
        "json".to_string(),
    ])
}

/// Runs Checkov over `dir`.
///
/// # Errors
///
/// Returns an error when Checkov cannot run, exits with a code other than
/// 0 or 1, or prints a report that cannot be decoded.
pub fn run_checkov(
    invoker: &Invoker,
    config: &CheckovConfig,
    dir: &Path,
) -> Result<CheckovScan, HarnessError> {
    let spec = checkov_command(config, dir);
    let output = invoker.run_unchecked(&spec)?;
    if !output.success() && output.status != Some(FINDINGS_EXIT_CODE) {
        return Err(ToolFailure {
            command: spec.display(),
            status: output.status,
            output: output.combined,
        }
        .into());
    }
    let report = if output.stdout.trim().is_empty() {
        ThreatReport::default()
    } else {
        ThreatReport::from_checkov_str(&output.stdout)?
    };
    Ok(CheckovScan {
        report,
        fail_on: config.fail_on,
        diagnostics: output.stderr,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
