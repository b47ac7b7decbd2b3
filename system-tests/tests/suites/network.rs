// system-tests/tests/suites/network.rs
// ============================================================================
// Module: Network Integration Tests
// Description: Live checks of the ingress VPC, subnets, and firewall rules.
// Purpose: Confirm the applied network matches the plan-level contract.
// Dependencies: system-tests helpers, edge-contract-core, edge-contract-harness
// ============================================================================

//! Each test applies the core module into its own scratch workspace, reads
//! the live resources through `gcloud`, then tears the deployment down.

use edge_contract_core::Checks;
use edge_contract_core::security::source_ranges_match;
use edge_contract_core::security::violation_for;
use edge_contract_harness::TestReporter;
use helpers::artifacts::finish_checks;
use helpers::artifacts::outcome;
use helpers::env::SystemHarness;
use helpers::fixtures::CLOUDFLARE_IPV4_RANGES;
use helpers::fixtures::CORE_MODULE;
use helpers::fixtures::INGRESS_VPC;
use helpers::fixtures::ModuleVars;
use helpers::fixtures::PROJECT_SUFFIX;
use serde_json::Value;

use crate::helpers;

/// Ingress subnet name in GCP.
const INGRESS_SUBNET: &str = "ingress-subnet";

#[test]
fn ingress_vpc_is_custom_mode() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("ingress_vpc_is_custom_mode")?;
    let harness = SystemHarness::load()?;
    let workspace =
        harness.workspace(CORE_MODULE, "vpc", &ModuleVars::core(&harness.credentials))?;
    let deployment = workspace.tofu().apply()?;

    let network = harness.gcloud().describe_network(INGRESS_VPC)?;
    reporter.attach_json("network.json", &network)?;
    let mut checks = Checks::new("ingress vpc");
    checks.check(
        "ingress-vpc has auto_create_subnetworks=false",
        outcome(
            network.get("autoCreateSubnetworks") == Some(&Value::Bool(false)),
            "ingress-vpc creates subnetworks automatically",
        ),
    );
    deployment.teardown()?;
    finish_checks(&mut reporter, checks)?;
    Ok(())
}

#[test]
fn https_firewall_admits_only_cloudflare() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("https_firewall_admits_only_cloudflare")?;
    let harness = SystemHarness::load()?;
    let vars = ModuleVars::core(&harness.credentials).set("enable_cloudflare_proxy", true);
    let workspace = harness.workspace(CORE_MODULE, "firewall", &vars)?;
    let deployment = workspace.tofu().apply()?;

    let rule = harness.gcloud().describe_firewall(&format!("{PROJECT_SUFFIX}-allow-https"))?;
    reporter.attach_json("firewall.json", &rule)?;
    let mut checks = Checks::new("https firewall");
    checks.check("rule is INGRESS", outcome(rule.is_ingress(), "rule is not INGRESS"));
    checks.check("rule allows tcp:443", outcome(rule.allows_tcp_port(443), "tcp:443 is not allowed"));
    checks.check(
        "source ranges equal the Cloudflare ranges",
        source_ranges_match(&rule, &CLOUDFLARE_IPV4_RANGES),
    );
    checks.check(
        "rule is not open to the internet",
        outcome(!rule.exposes_publicly(443), "rule admits 0.0.0.0/0 on tcp:443"),
    );
    checks.check(
        "rule is attached to ingress-vpc",
        outcome(
            rule.network.as_deref().is_some_and(|network| network.contains(INGRESS_VPC)),
            "rule is not on ingress-vpc",
        ),
    );
    deployment.teardown()?;
    finish_checks(&mut reporter, checks)?;
    Ok(())
}

#[test]
fn cis_network_controls_hold() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("cis_network_controls_hold")?;
    let harness = SystemHarness::load()?;
    let workspace =
        harness.workspace(CORE_MODULE, "cis", &ModuleVars::core(&harness.credentials))?;
    let deployment = workspace.tofu().apply()?;
    let gcloud = harness.gcloud();

    let subnet = gcloud.describe_subnetwork(INGRESS_SUBNET)?;
    let rules = gcloud.list_firewall_rules(Some(&format!("network:{INGRESS_VPC}")))?;
    reporter.attach_json("firewall-rules.json", &rules)?;

    let mut checks = Checks::new("cis networking");
    checks.check(
        "CIS 3.9: Private Google Access is enabled on the ingress subnet",
        outcome(
            subnet.get("privateIpGoogleAccess") == Some(&Value::Bool(true)),
            "privateIpGoogleAccess is not true",
        ),
    );
    for (control, port) in [("CIS 3.6: SSH", 22), ("CIS 3.7: RDP", 3389)] {
        let violations: Vec<String> =
            rules.iter().filter_map(|rule| violation_for(rule, port)).map(|v| v.to_string()).collect();
        checks.check(
            format!("{control} (tcp:{port}) is not open to the internet"),
            outcome(violations.is_empty(), &violations.join("; ")),
        );
    }
    deployment.teardown()?;
    finish_checks(&mut reporter, checks)?;
    Ok(())
}
