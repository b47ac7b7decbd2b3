// system-tests/tests/suites/contract_core.rs
// ============================================================================
// Module: Core Module Contract Tests
// Description: Plan-only contract checks for deploy/opentofu/gcp/core.
// Purpose: Pin networking, toggles, exposure, and input validation.
// Dependencies: system-tests helpers, edge-contract-core, edge-contract-harness
// ============================================================================

//! Plan-only contract tests for the core module. Nothing is applied.

use edge_contract_core::Checks;
use edge_contract_core::ContractAssertion;
use edge_contract_core::ContractSuite;
use edge_contract_core::DeclarationKind;
use edge_contract_core::ResourceSelector;
use edge_contract_core::security::admin_port_outcomes;
use edge_contract_core::security::exposure_outcome;
use edge_contract_core::toggle_superset;
use edge_contract_harness::TestReporter;
use helpers::artifacts::attach_plan;
use helpers::artifacts::finish_checks;
use helpers::artifacts::outcome;
use helpers::env::SystemHarness;
use helpers::fixtures::CORE_MODULE;
use helpers::fixtures::CORE_VARIABLES;
use helpers::fixtures::ModuleVars;
use helpers::fixtures::core_psc_neg;
use helpers::fixtures::waf_policy;
use serde_json::json;

use crate::helpers;

/// Networking contract every core plan must satisfy.
fn core_networking_suite() -> ContractSuite {
    let vpc = ResourceSelector::new("google_compute_network", "ingress_vpc");
    ContractSuite {
        name: "core networking".to_string(),
        description: Some("Ingress VPC lives in the core project without Shared VPC".to_string()),
        assertions: vec![
            ContractAssertion::NoResourceOfType {
                resource_type: "shared_vpc".to_string(),
                substring: true,
            },
            ContractAssertion::ResourcePresent {
                target: vpc.clone(),
            },
            ContractAssertion::AttributeEquals {
                target: vpc,
                path: "auto_create_subnetworks".to_string(),
                expected: json!(false),
            },
            ContractAssertion::ResourcePresent {
                target: ResourceSelector::new("google_compute_subnetwork", "ingress_subnet"),
            },
            ContractAssertion::ResourcePresent {
                target: ResourceSelector::new("google_compute_subnetwork", "proxy_only_subnet"),
            },
            ContractAssertion::ForbiddenValue {
                resource_type: "google_compute_firewall".to_string(),
                path: "source_ranges".to_string(),
                forbidden: json!("0.0.0.0/0"),
            },
            ContractAssertion::Declared {
                item: DeclarationKind::Variable,
                names: CORE_VARIABLES.iter().map(ToString::to_string).collect(),
            },
        ],
    }
}

#[test]
fn core_plan_satisfies_networking_contract() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("core_plan_satisfies_networking_contract")?;
    let harness = SystemHarness::load()?;
    let workspace =
        harness.workspace(CORE_MODULE, "core-contract", &ModuleVars::core(&harness.credentials))?;
    let index = workspace.tofu().plan_json()?;
    attach_plan(&mut reporter, "plan.json", &index)?;

    let mut checks = core_networking_suite().run(&index, None);
    checks.check("tcp:443 is not open to 0.0.0.0/0", exposure_outcome(&index, 443));
    for (label, outcome) in admin_port_outcomes(&index) {
        checks.check(label, outcome);
    }
    finish_checks(&mut reporter, checks)?;
    Ok(())
}

#[test]
fn waf_toggle_gates_exactly_the_policy() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("waf_toggle_gates_exactly_the_policy")?;
    let harness = SystemHarness::load()?;
    let base = ModuleVars::core(&harness.credentials);
    let enabled = harness.workspace(CORE_MODULE, "waf-on", &base.clone().set("enable_waf", true))?;
    let disabled = harness.workspace(CORE_MODULE, "waf-off", &base.set("enable_waf", false))?;
    let on = enabled.tofu().plan_json()?;
    let off = disabled.tofu().plan_json()?;

    let mut checks = Checks::new("waf toggle");
    checks.check("enable_waf adds only the WAF policy", toggle_superset(&on, &off, &[waf_policy()]));
    finish_checks(&mut reporter, checks)?;
    Ok(())
}

#[test]
fn psc_neg_follows_its_toggle() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("psc_neg_follows_its_toggle")?;
    let harness = SystemHarness::load()?;
    let base = ModuleVars::core(&harness.credentials).set("enable_demo_web_app", true);
    let enabled = harness
        .workspace(CORE_MODULE, "psc-on", &base.clone().set("enable_demo_web_app_psc_neg", true))?;
    let disabled =
        harness.workspace(CORE_MODULE, "psc-off", &base.set("enable_demo_web_app_psc_neg", false))?;
    let on = enabled.tofu().plan_json()?;
    let off = disabled.tofu().plan_json()?;

    let neg = ResourceSelector::new(
        "google_compute_region_network_endpoint_group",
        "demo_web_app_psc_neg",
    );
    let presence = ContractAssertion::ConditionalPresence {
        target: neg,
        toggle: "enable_demo_web_app_psc_neg".to_string(),
    };
    let mut checks = Checks::new("psc toggle");
    checks.assert(&on, None, &presence);
    checks.assert(&off, None, &presence);
    checks.check(
        "enable_demo_web_app_psc_neg adds only the PSC NEG",
        toggle_superset(&on, &off, &[core_psc_neg()]),
    );
    finish_checks(&mut reporter, checks)?;
    Ok(())
}

#[test]
fn invalid_project_suffix_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("invalid_project_suffix_is_rejected")?;
    let harness = SystemHarness::load()?;
    let vars = ModuleVars::core(&harness.credentials).set("project_suffix", "invalid");
    let workspace = harness.workspace(CORE_MODULE, "bad-suffix", &vars)?;
    let output = workspace.tofu().plan_unchecked()?;
    reporter.attach_text("plan.log", &output.combined)?;

    let mut checks = Checks::new("project_suffix validation");
    checks.check(
        "plan fails",
        outcome(!output.success(), "plan succeeded with project_suffix=invalid"),
    );
    checks.check(
        "validation message names the allowed suffixes",
        outcome(
            output.combined.contains("project_suffix must be 'nonprod' or 'prod'"),
            "validation message missing from plan output",
        ),
    );
    finish_checks(&mut reporter, checks)?;
    Ok(())
}
