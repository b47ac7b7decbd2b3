// crates/edge-contract-core/tests/common/mod.rs
// ============================================================================
// Module: Common Plan Fixtures
// Description: Builders for synthetic `tofu show -json` plan documents.
// Purpose: Share realistic plan shapes across core test suites.
// Dependencies: serde_json, edge-contract-core
// ============================================================================

//! ## Overview
//! Fixtures mirror the JSON the engine renders for the edge modules: a core
//! networking module with toggle-gated WAF and PSC resources, plus a
//! multi-module plan that reuses resource names across modules.

#![allow(dead_code, reason = "Shared test helpers may be unused in some suites.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

use edge_contract_core::PlanIndex;
use serde_json::Value;
use serde_json::json;

/// Cloudflare IPv4 ranges used as firewall sources.
pub const CLOUDFLARE_RANGES: [&str; 3] = ["173.245.48.0/20", "103.21.244.0/22", "103.22.200.0/22"];

/// Builds one resource change entry.
pub fn change(
    module: Option<&str>,
    resource_type: &str,
    name: &str,
    actions: &[&str],
    after: Option<Value>,
) -> Value {
    let local = format!("{resource_type}.{name}");
    let address = module.map_or_else(|| local.clone(), |module| format!("{module}.{local}"));
    let mut entry = json!({
        "address": address,
        "mode": "managed",
        "type": resource_type,
        "name": name,
        "provider_name": "registry.opentofu.org/hashicorp/google",
        "change": {
            "actions": actions,
            "before": null,
            "after": after,
            "after_unknown": {"id": true, "self_link": true}
        }
    });
    if let Some(module) = module {
        entry["module_address"] = json!(module);
    }
    entry
}

/// Builds a create change in a module.
pub fn create(module: Option<&str>, resource_type: &str, name: &str, after: Value) -> Value {
    change(module, resource_type, name, &["create"], Some(after))
}

/// Wraps resource changes and variables into a plan document.
pub fn plan_document(changes: Vec<Value>, variables: Value) -> Value {
    let variables = variables
        .as_object()
        .map(|vars| {
            vars.iter()
                .map(|(name, value)| (name.clone(), json!({"value": value})))
                .collect::<serde_json::Map<String, Value>>()
        })
        .unwrap_or_default();
    json!({
        "format_version": "1.2",
        "terraform_version": "1.8.5",
        "variables": variables,
        "resource_changes": changes,
        "output_changes": {},
        "configuration": {"root_module": {}}
    })
}

/// Builds the core networking plan for the given toggles.
pub fn core_plan(enable_waf: bool, enable_psc: bool) -> Value {
    let module = Some("module.core");
    let mut changes = vec![
        create(module, "google_compute_network", "ingress_vpc", json!({
            "name": "ingress-vpc-nonprod",
            "auto_create_subnetworks": false,
            "routing_mode": "GLOBAL"
        })),
        create(module, "google_compute_network", "egress_vpc", json!({
            "name": "egress-vpc-nonprod",
            "auto_create_subnetworks": false,
            "routing_mode": "REGIONAL"
        })),
        create(module, "google_compute_subnetwork", "ingress_subnet", json!({
            "name": "ingress-subnet",
            "ip_cidr_range": "10.0.1.0/24",
            "region": "northamerica-northeast2",
            "private_ip_google_access": true,
            "log_config": [{"aggregation_interval": "INTERVAL_5_SEC", "flow_sampling": 0.5}]
        })),
        create(module, "google_compute_subnetwork", "proxy_only_subnet", json!({
            "name": "proxy-only-subnet",
            "ip_cidr_range": "10.0.2.0/24",
            "purpose": "REGIONAL_MANAGED_PROXY",
            "role": "ACTIVE"
        })),
        create(module, "google_compute_firewall", "allow_cloudflare_https", json!({
            "name": "allow-cloudflare-https",
            "direction": "INGRESS",
            "disabled": false,
            "source_ranges": CLOUDFLARE_RANGES,
            "allow": [{"protocol": "tcp", "ports": ["443"]}],
            "log_config": [{"metadata": "INCLUDE_ALL_METADATA"}]
        })),
        create(module, "google_compute_firewall", "allow_health_checks", json!({
            "name": "allow-health-checks",
            "direction": "INGRESS",
            "source_ranges": ["35.191.0.0/16", "130.211.0.0/22"],
            "allow": [{"protocol": "tcp", "ports": ["80", "443"]}]
        })),
    ];
    if enable_waf {
        changes.push(create(module, "google_compute_security_policy", "edge_waf", json!({
            "name": "edge-waf-policy",
            "type": "CLOUD_ARMOR",
            "adaptive_protection_config": [{"layer_7_ddos_defense_config": [{"enable": true}]}]
        })));
    }
    if enable_psc {
        changes.push(create(module, "google_compute_service_attachment", "psc", json!({
            "name": "psc-attachment",
            "connection_preference": "ACCEPT_AUTOMATIC",
            "enable_proxy_protocol": false
        })));
        changes.push(create(module, "google_compute_region_network_endpoint_group", "psc_neg", json!({
            "name": "psc-neg",
            "network_endpoint_type": "PRIVATE_SERVICE_CONNECT"
        })));
    }
    plan_document(
        changes,
        json!({
            "project_suffix": "nonprod",
            "region": "northamerica-northeast2",
            "enable_waf": enable_waf,
            "enable_psc": enable_psc
        }),
    )
}

/// Builds a plan where two modules declare `google_compute_network.vpc`.
pub fn multi_module_plan() -> Value {
    plan_document(
        vec![
            create(Some("module.ingress"), "google_compute_network", "vpc", json!({
                "name": "ingress-vpc",
                "routing_mode": "GLOBAL"
            })),
            create(Some("module.egress"), "google_compute_network", "vpc", json!({
                "name": "egress-vpc",
                "routing_mode": "REGIONAL"
            })),
        ],
        json!({}),
    )
}

/// Indexes a plan document.
pub fn index(document: &Value) -> PlanIndex {
    PlanIndex::from_json_str(&document.to_string()).unwrap()
}
