// system-tests/tests/suites/psc_toggle.rs
// ============================================================================
// Module: PSC Toggle Integration Tests
// Description: Applies the core module with the PSC NEG on and off.
// Purpose: Confirm the toggle output and the live NEG agree.
// Dependencies: system-tests helpers, edge-contract-core, edge-contract-harness
// ============================================================================

//! The two applies run sequentially in separate scratch workspaces.

use edge_contract_core::Checks;
use edge_contract_core::ContractAssertion;
use edge_contract_harness::ResourceKind;
use edge_contract_harness::TestReporter;
use helpers::artifacts::finish_checks;
use helpers::artifacts::outcome;
use helpers::env::SystemHarness;
use helpers::fixtures::CORE_MODULE;
use helpers::fixtures::ModuleVars;
use serde_json::json;

use crate::helpers;

/// Live name of the core PSC NEG.
const PSC_NEG: &str = "demo-web-app-psc-neg";

/// Applies with `enabled` and records the output and live existence.
fn check_psc(
    harness: &SystemHarness,
    checks: &mut Checks,
    enabled: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let vars = ModuleVars::core(&harness.credentials)
        .set("enable_demo_web_app", true)
        .set("enable_psc", enabled)
        .set("enable_demo_web_app_psc_neg", enabled);
    let state = if enabled { "enabled" } else { "disabled" };
    let workspace = harness.workspace(CORE_MODULE, &format!("psc-{state}"), &vars)?;
    let deployment = workspace.tofu().apply()?;
    let outputs = deployment.output()?;

    checks.assert(
        deployment.plan(),
        Some(&outputs),
        &ContractAssertion::OutputEquals {
            output: "psc_enabled".to_string(),
            expected: json!(enabled),
        },
    );
    let exists = harness.gcloud().exists(ResourceKind::RegionNeg, PSC_NEG)?;
    checks.check(
        format!("{PSC_NEG} presence matches PSC {state}"),
        outcome(exists == enabled, &format!("{PSC_NEG} exists={exists} with PSC {state}")),
    );
    deployment.teardown()?;
    Ok(())
}

#[test]
fn psc_neg_tracks_the_toggle() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("psc_neg_tracks_the_toggle")?;
    let harness = SystemHarness::load()?;
    let mut checks = Checks::new("psc toggle");
    check_psc(&harness, &mut checks, true)?;
    check_psc(&harness, &mut checks, false)?;
    finish_checks(&mut reporter, checks)?;
    Ok(())
}
