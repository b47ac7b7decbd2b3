// system-tests/tests/suites/lifecycle.rs
// ============================================================================
// Module: Lifecycle Integration Tests
// Description: Idempotent re-plans and complete teardown.
// Purpose: Confirm apply converges and destroy leaves nothing behind.
// Dependencies: system-tests helpers, edge-contract-core, edge-contract-harness
// ============================================================================

//! Lifecycle properties of the core module against a live project.

use edge_contract_core::Checks;
use edge_contract_harness::ResourceKind;
use edge_contract_harness::TestReporter;
use edge_contract_harness::wait_until;
use helpers::artifacts::attach_plan;
use helpers::artifacts::finish_checks;
use helpers::artifacts::outcome;
use helpers::env::SystemHarness;
use helpers::fixtures::CORE_MODULE;
use helpers::fixtures::INGRESS_VPC;
use helpers::fixtures::ModuleVars;
use helpers::fixtures::PROJECT_SUFFIX;
use helpers::timeouts::POLL_INTERVAL;
use helpers::timeouts::PROPAGATION_DEADLINE;
use helpers::timeouts::resolve_timeout;

use crate::helpers;

#[test]
fn replan_after_apply_is_empty() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("replan_after_apply_is_empty")?;
    let harness = SystemHarness::load()?;
    let workspace =
        harness.workspace(CORE_MODULE, "idempotence", &ModuleVars::core(&harness.credentials))?;
    let deployment = workspace.tofu().apply()?;

    let replan = deployment.workspace().plan_json()?;
    attach_plan(&mut reporter, "replan.json", &replan)?;
    let pending: Vec<String> =
        replan.pending_changes().iter().map(|change| change.address.clone()).collect();
    let mut checks = Checks::new("idempotence");
    checks.check(
        "a second plan proposes no changes",
        outcome(replan.is_empty_diff(), &format!("pending: {}", pending.join(", "))),
    );
    deployment.teardown()?;
    finish_checks(&mut reporter, checks)?;
    Ok(())
}

#[test]
fn teardown_removes_every_resource() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("teardown_removes_every_resource")?;
    let harness = SystemHarness::load()?;
    let vars = ModuleVars::core(&harness.credentials).set("enable_logging", false);
    let workspace = harness.workspace(CORE_MODULE, "teardown", &vars)?;
    let gcloud = harness.gcloud();
    let https_rule = format!("{PROJECT_SUFFIX}-allow-https");

    let deployment = workspace.tofu().apply()?;
    let mut checks = Checks::new("teardown");
    checks.require(
        "ingress-vpc exists after apply",
        outcome(gcloud.exists(ResourceKind::Network, INGRESS_VPC)?, "ingress-vpc was not created"),
    )?;
    checks.require(
        "https firewall rule exists after apply",
        outcome(gcloud.exists(ResourceKind::Firewall, &https_rule)?, "firewall rule was not created"),
    )?;

    deployment.teardown()?;
    let deadline = resolve_timeout(PROPAGATION_DEADLINE, &harness.env);
    wait_until("ingress-vpc deletion", deadline, POLL_INTERVAL, || {
        Ok((!gcloud.exists(ResourceKind::Network, INGRESS_VPC)?).then_some(()))
    })?;
    checks.check(
        "https firewall rule is gone",
        outcome(!gcloud.exists(ResourceKind::Firewall, &https_rule)?, "firewall rule survived destroy"),
    );
    let remaining = workspace.tofu().state_list()?;
    checks.check(
        "state list is empty",
        outcome(remaining.is_empty(), &format!("remaining: {}", remaining.join(", "))),
    );
    finish_checks(&mut reporter, checks)?;
    Ok(())
}
