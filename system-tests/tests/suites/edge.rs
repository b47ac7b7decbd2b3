// system-tests/tests/suites/edge.rs
// ============================================================================
// Module: Edge Security Integration Tests
// Description: Live checks of Cloud Armor outputs and resource labels.
// Purpose: Confirm WAF outputs and mandatory labels after apply.
// Dependencies: system-tests helpers, edge-contract-core, edge-contract-harness
// ============================================================================

//! Applies the core module with WAF enabled and inspects outputs and labels.

use std::collections::BTreeMap;

use edge_contract_core::Checks;
use edge_contract_core::ContractAssertion;
use edge_contract_harness::ResourceKind;
use edge_contract_harness::TestReporter;
use edge_contract_harness::gcloud::labels_outcome;
use helpers::artifacts::finish_checks;
use helpers::artifacts::outcome;
use helpers::env::SystemHarness;
use helpers::fixtures::CORE_MODULE;
use helpers::fixtures::INGRESS_VPC;
use helpers::fixtures::ModuleVars;
use helpers::fixtures::PROJECT_SUFFIX;
use serde_json::json;

use crate::helpers;

#[test]
fn waf_outputs_report_cloud_armor() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("waf_outputs_report_cloud_armor")?;
    let harness = SystemHarness::load()?;
    let vars = ModuleVars::core(&harness.credentials).set("enable_waf", true);
    let workspace = harness.workspace(CORE_MODULE, "waf", &vars)?;
    let deployment = workspace.tofu().apply()?;
    let outputs = deployment.output()?;

    let mut checks = Checks::new("waf outputs");
    checks.assert(
        deployment.plan(),
        Some(&outputs),
        &ContractAssertion::OutputNonEmpty {
            output: "waf_policy_id".to_string(),
        },
    );
    checks.assert(
        deployment.plan(),
        Some(&outputs),
        &ContractAssertion::OutputEquals {
            output: "cloud_armor_enabled".to_string(),
            expected: json!(true),
        },
    );
    deployment.teardown()?;
    finish_checks(&mut reporter, checks)?;
    Ok(())
}

#[test]
fn resources_carry_mandatory_labels() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("resources_carry_mandatory_labels")?;
    let harness = SystemHarness::load()?;
    let vars = ModuleVars::core(&harness.credentials).with_resource_tags();
    let workspace = harness.workspace(CORE_MODULE, "tagging", &vars)?;
    let deployment = workspace.tofu().apply()?;
    let gcloud = harness.gcloud();

    let labels = gcloud.labels_of(ResourceKind::Network, INGRESS_VPC)?;
    reporter.attach_json("labels.json", &labels)?;
    let expected = BTreeMap::from([
        ("managed-by", "opentofu"),
        ("project-suffix", PROJECT_SUFFIX),
        ("team", "infrastructure"),
        ("cost-center", "engineering"),
    ]);
    let labeled = gcloud.search_labeled_assets("project-suffix", PROJECT_SUFFIX)?;

    let mut checks = Checks::new("labels");
    checks.check("ingress-vpc carries the mandatory labels", labels_outcome(&labels, &expected));
    checks.check(
        "assets are discoverable by project-suffix",
        outcome(!labeled.is_empty(), "no assets carry the project-suffix label"),
    );
    deployment.teardown()?;
    finish_checks(&mut reporter, checks)?;
    Ok(())
}
