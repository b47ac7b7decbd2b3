// system-tests/tests/suites/baseline.rs
// ============================================================================
// Module: Full Baseline Integration Tests
// Description: Core plus demo app end to end, including HTTP reachability.
// Purpose: Prove traffic flows through the load balancer and nowhere else.
// Dependencies: system-tests helpers, edge-contract-core, edge-contract-harness
// ============================================================================

//! The load balancer takes minutes to program, so the HTTPS probe retries
//! with a fixed delay until the configured deadline.

use edge_contract_core::Checks;
use edge_contract_core::ContractAssertion;
use edge_contract_harness::HttpProbe;
use edge_contract_harness::TestReporter;
use edge_contract_harness::probe::http_get_with_retry;
use edge_contract_harness::probe::status_of;
use helpers::artifacts::finish_checks;
use helpers::artifacts::outcome;
use helpers::env::SystemHarness;
use helpers::fixtures::CORE_MODULE;
use helpers::fixtures::DEMO_MODULE;
use helpers::fixtures::INGRESS_VPC;
use helpers::fixtures::ModuleVars;
use helpers::fixtures::PROJECT_SUFFIX;
use helpers::timeouts::POLL_INTERVAL;
use helpers::timeouts::PROBE_ATTEMPTS;
use helpers::timeouts::PROPAGATION_DEADLINE;
use helpers::timeouts::resolve_timeout;

use crate::helpers;

/// Host the self-signed certificate is issued for.
const PLACEHOLDER_HOST: &str = "example.com";

/// Demo container image.
const DEMO_IMAGE: &str = "us-docker.pkg.dev/cloudrun/container/hello";

#[test]
fn baseline_serves_through_the_load_balancer_only() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("baseline_serves_through_the_load_balancer_only")?;
    let harness = SystemHarness::load()?;
    let vars = ModuleVars::core(&harness.credentials)
        .set("enable_demo_web_app", true)
        .set("demo_web_app_image", DEMO_IMAGE);
    let workspace = harness.workspace(CORE_MODULE, "baseline", &vars)?;
    let deployment = workspace.tofu().apply()?;
    let outputs = deployment.output()?;
    let gcloud = harness.gcloud();

    let mut checks = Checks::new("full baseline");
    checks.require_assertion(
        deployment.plan(),
        Some(&outputs),
        &ContractAssertion::OutputNonEmpty {
            output: "load_balancer_ip".to_string(),
        },
    )?;
    let rules = gcloud.list_firewall_rules(Some(&format!("network:{INGRESS_VPC}")))?;
    checks.check("firewall rules are provisioned", outcome(!rules.is_empty(), "no firewall rules"));

    let address = outputs.render("load_balancer_ip").unwrap_or_default();
    let deadline = resolve_timeout(PROPAGATION_DEADLINE, &harness.env);
    let attempts = deadline
        .as_secs()
        .checked_div(POLL_INTERVAL.as_secs())
        .and_then(|count| u32::try_from(count).ok())
        .map_or(PROBE_ATTEMPTS, |count| count.max(1));
    let probe = HttpProbe::new(format!("https://{address}/"), 200).host(PLACEHOLDER_HOST).insecure();
    let served = http_get_with_retry(harness.invoker.sink(), &probe, attempts, POLL_INTERVAL);
    checks.check(
        "load balancer answers 200 for the placeholder host",
        outcome(served.is_ok(), &served.err().map(|err| err.to_string()).unwrap_or_default()),
    );

    let service_url = gcloud.run_service_url(&format!("{PROJECT_SUFFIX}-demo-api"))?;
    let direct = status_of(&service_url)?;
    checks.check(
        "direct Cloud Run access is blocked",
        outcome(matches!(direct, 403 | 404), &format!("direct access returned {direct}")),
    );
    deployment.teardown()?;
    finish_checks(&mut reporter, checks)?;
    Ok(())
}

#[test]
fn demo_module_exposes_service_outputs() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("demo_module_exposes_service_outputs")?;
    let harness = SystemHarness::load()?;
    let vars = ModuleVars::demo(&harness.credentials)
        .set("cloudedge_project_id", harness.credentials.project_id.as_str())
        .set("cloudedge_github_repository", "vibetics-cloudedge")
        .set("enable_demo_web_app", true)
        .set("demo_web_app_image", DEMO_IMAGE)
        .set("enable_demo_web_app_internal_alb", true);
    let workspace = harness.workspace(DEMO_MODULE, "demo-app", &vars)?;
    let deployment = workspace.tofu().apply()?;
    let outputs = deployment.output()?;

    let mut checks = Checks::new("demo outputs");
    for output in ["web_app_cloud_run_service_name", "web_app_backend_service_id"] {
        checks.assert(
            deployment.plan(),
            Some(&outputs),
            &ContractAssertion::OutputNonEmpty {
                output: output.to_string(),
            },
        );
    }
    deployment.teardown()?;
    finish_checks(&mut reporter, checks)?;
    Ok(())
}
