// system-tests/tests/helpers/artifacts.rs
// ============================================================================
// Module: Test Artifacts
// Description: Reporter helpers for system-tests.
// Purpose: Persist check results and plans next to each test summary.
// Dependencies: edge-contract-core, edge-contract-harness
// ============================================================================

use edge_contract_core::AssertionOutcome;
use edge_contract_core::Checks;
use edge_contract_core::PlanIndex;
use edge_contract_harness::HarnessError;
use edge_contract_harness::ReportStatus;
use edge_contract_harness::TestReporter;

/// Records `checks`, writes the summary, and fails when any check failed.
///
/// # Errors
///
/// Returns [`HarnessError::Assertion`] listing every failed check, or an
/// error when the summary cannot be written.
pub fn finish_checks(reporter: &mut TestReporter, checks: Checks) -> Result<(), HarnessError> {
    reporter.record_checks(&checks);
    let status = if checks.all_passed() { ReportStatus::Passed } else { ReportStatus::Failed };
    reporter.finish(status)?;
    checks.finish()?;
    Ok(())
}

/// Attaches a compact view of a plan: addresses and action counts.
///
/// # Errors
///
/// Returns an error when the artifact cannot be written.
pub fn attach_plan(
    reporter: &mut TestReporter,
    name: &str,
    index: &PlanIndex,
) -> Result<(), HarnessError> {
    let addresses: Vec<&str> = index.iter().map(|change| change.address.as_str()).collect();
    reporter.attach_json(
        name,
        &serde_json::json!({
            "format_version": index.plan().format_version(),
            "actions": index.action_counts(),
            "addresses": addresses,
        }),
    )
}

/// Maps a boolean into an outcome carrying `message` on failure.
#[must_use]
pub fn outcome(holds: bool, message: &str) -> AssertionOutcome {
    if holds { AssertionOutcome::Pass } else { AssertionOutcome::fail(message) }
}
