// system-tests/tests/suites/contract_demo.rs
// ============================================================================
// Module: Demo Web App Contract Tests
// Description: Plan-only contract checks for deploy/opentofu/gcp/demo-web-app.
// Purpose: Pin the isolated VPC, ingress lockdown, PSC, and internal ALB.
// Dependencies: system-tests helpers, edge-contract-core, edge-contract-harness
// ============================================================================

//! Plan-only contract tests for the demo web app module.

use edge_contract_core::Checks;
use edge_contract_core::ContractAssertion;
use edge_contract_core::ContractSuite;
use edge_contract_core::ResourceSelector;
use edge_contract_core::toggle_superset;
use edge_contract_harness::TestReporter;
use helpers::artifacts::attach_plan;
use helpers::artifacts::finish_checks;
use helpers::env::SystemHarness;
use helpers::fixtures::DEMO_MODULE;
use helpers::fixtures::ModuleVars;
use helpers::fixtures::demo_psc_attachment;
use helpers::fixtures::demo_psc_nat_subnet;
use serde_json::json;

use crate::helpers;

/// Builds a presence assertion.
fn present(resource_type: &str, name: &str) -> ContractAssertion {
    ContractAssertion::ResourcePresent {
        target: ResourceSelector::new(resource_type, name),
    }
}

/// Contract for the demo app with PSC and the internal ALB enabled.
fn demo_suite() -> ContractSuite {
    ContractSuite {
        name: "demo web app".to_string(),
        description: None,
        assertions: vec![
            ContractAssertion::NoResourceOfType {
                resource_type: "shared_vpc".to_string(),
                substring: true,
            },
            present("google_compute_network", "web_vpc"),
            present("google_compute_subnetwork", "web_subnet"),
            present("google_compute_subnetwork", "proxy_only_subnet"),
            present("google_compute_subnetwork", "psc_nat_subnet"),
            present("google_compute_service_attachment", "web_app_psc_attachment"),
            present("google_compute_region_url_map", "internal_alb_url_map"),
            present("google_compute_region_target_https_proxy", "internal_alb_https_proxy"),
            present("google_compute_forwarding_rule", "internal_alb_forwarding_rule"),
            present("tls_private_key", "self_signed_cert_key"),
            present("tls_self_signed_cert", "self_signed_cert"),
            present("google_compute_region_ssl_certificate", "internal_alb_cert_binding"),
            ContractAssertion::AttributeEquals {
                target: ResourceSelector::new("google_cloud_run_v2_service", "web_app"),
                path: "ingress".to_string(),
                expected: json!("INGRESS_TRAFFIC_INTERNAL_LOAD_BALANCER"),
            },
            ContractAssertion::AttributeInSet {
                target: ResourceSelector::new(
                    "google_compute_region_network_endpoint_group",
                    "web_app_neg",
                ),
                path: "network_endpoint_type".to_string(),
                allowed: vec![json!("SERVERLESS"), json!("PRIVATE_SERVICE_CONNECT")],
            },
            ContractAssertion::AttributeInSet {
                target: ResourceSelector::new("google_compute_region_backend_service", "web_app_backend"),
                path: "load_balancing_scheme".to_string(),
                allowed: vec![json!("INTERNAL_MANAGED"), json!("EXTERNAL_MANAGED")],
            },
        ],
    }
}

#[test]
fn demo_plan_satisfies_isolation_contract() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("demo_plan_satisfies_isolation_contract")?;
    let harness = SystemHarness::load()?;
    let vars = ModuleVars::demo(&harness.credentials)
        .set("enable_demo_web_app_psc_neg", true)
        .set("enable_demo_web_app_internal_alb", true);
    let workspace = harness.workspace(DEMO_MODULE, "demo-contract", &vars)?;
    let index = workspace.tofu().plan_json()?;
    attach_plan(&mut reporter, "plan.json", &index)?;

    finish_checks(&mut reporter, demo_suite().run(&index, None))?;
    Ok(())
}

#[test]
fn internal_alb_resources_follow_their_toggle() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("internal_alb_resources_follow_their_toggle")?;
    let harness = SystemHarness::load()?;
    let base = ModuleVars::demo(&harness.credentials);
    let enabled = harness.workspace(
        DEMO_MODULE,
        "alb-on",
        &base.clone().set("enable_demo_web_app_internal_alb", true),
    )?;
    let disabled = harness.workspace(
        DEMO_MODULE,
        "alb-off",
        &base.set("enable_demo_web_app_internal_alb", false),
    )?;
    let on = enabled.tofu().plan_json()?;
    let off = disabled.tofu().plan_json()?;

    let mut checks = Checks::new("internal alb toggle");
    for (resource_type, name) in [
        ("google_compute_region_url_map", "internal_alb_url_map"),
        ("google_compute_region_target_https_proxy", "internal_alb_https_proxy"),
        ("google_compute_forwarding_rule", "internal_alb_forwarding_rule"),
    ] {
        let presence = ContractAssertion::ConditionalPresence {
            target: ResourceSelector::new(resource_type, name),
            toggle: "enable_demo_web_app_internal_alb".to_string(),
        };
        checks.assert(&on, None, &presence);
        checks.assert(&off, None, &presence);
    }
    finish_checks(&mut reporter, checks)?;
    Ok(())
}

#[test]
fn psc_attachment_follows_its_toggle() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("psc_attachment_follows_its_toggle")?;
    let harness = SystemHarness::load()?;
    let base = ModuleVars::demo(&harness.credentials);
    let enabled =
        harness.workspace(DEMO_MODULE, "attach-on", &base.clone().set("enable_demo_web_app_psc_neg", true))?;
    let disabled =
        harness.workspace(DEMO_MODULE, "attach-off", &base.set("enable_demo_web_app_psc_neg", false))?;
    let on = enabled.tofu().plan_json()?;
    let off = disabled.tofu().plan_json()?;

    let mut checks = Checks::new("psc attachment toggle");
    checks.check(
        "enable_demo_web_app_psc_neg adds the PSC attachment and its NAT subnet",
        toggle_superset(&on, &off, &[demo_psc_attachment(), demo_psc_nat_subnet()]),
    );
    finish_checks(&mut reporter, checks)?;
    Ok(())
}
