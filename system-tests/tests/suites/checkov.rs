// system-tests/tests/suites/checkov.rs
// ============================================================================
// Module: Checkov Contract Tests
// Description: Static analysis gate over each deployable module.
// Purpose: Fail on findings at or above the configured severity.
// Dependencies: system-tests helpers, edge-contract-core, edge-contract-harness
// ============================================================================

//! Runs `tofu validate` then Checkov on a scratch copy of each module and
//! stores the threat summary next to the test report.

use edge_contract_core::Checks;
use edge_contract_harness::TestReporter;
use edge_contract_harness::run_checkov;
use helpers::artifacts::finish_checks;
use helpers::env::SystemHarness;
use helpers::fixtures::CORE_MODULE;
use helpers::fixtures::DEMO_MODULE;
use helpers::fixtures::ModuleVars;
use helpers::fixtures::PROJECT_SINGLETON_MODULE;

use crate::helpers;

/// Validates and scans one module.
fn scan_module(
    test_name: &str,
    module: &str,
    vars: impl FnOnce(&SystemHarness) -> ModuleVars,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new(test_name)?;
    let harness = SystemHarness::load()?;
    let workspace = harness.workspace(module, module, &vars(&harness))?;
    workspace.tofu().validate()?;

    let scan = run_checkov(&harness.invoker, &harness.config.checkov, workspace.dir())?;
    reporter.attach_text("threat-summary.md", &scan.report.summary_markdown())?;
    reporter.attach_json("severity-counts.json", &scan.report.counts())?;

    let mut checks = Checks::new(&format!("checkov {module}"));
    checks.check("checkov reported no tool errors", scan.tool_error_outcome());
    checks.check(
        format!("no findings at or above {}", scan.fail_on.as_str()),
        scan.gate(),
    );
    finish_checks(&mut reporter, checks)?;
    Ok(())
}

#[test]
fn scan_project_singleton() -> Result<(), Box<dyn std::error::Error>> {
    scan_module("scan_project_singleton", PROJECT_SINGLETON_MODULE, |_| ModuleVars::none())
}

#[test]
fn core_module_passes_checkov() -> Result<(), Box<dyn std::error::Error>> {
    scan_module("core_module_passes_checkov", CORE_MODULE, |harness| {
        ModuleVars::core(&harness.credentials)
    })
}

#[test]
fn demo_module_passes_checkov() -> Result<(), Box<dyn std::error::Error>> {
    scan_module("demo_module_passes_checkov", DEMO_MODULE, |harness| {
        ModuleVars::demo(&harness.credentials)
    })
}
