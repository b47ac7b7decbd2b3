// system-tests/tests/helpers/fixtures.rs
// ============================================================================
// Module: System Test Fixtures
// Description: Canonical module inputs and expected resource sets.
// Purpose: Keep variable names and resource identities in one place.
// Dependencies: edge-contract-core, serde_json, system-tests
// ============================================================================

//! ## Overview
//! Inputs follow the `project_suffix` / `cloudedge_*` / `demo_web_app_*`
//! variable schema. Resource identities mirror the names declared in the
//! core and demo-web-app modules.

use std::collections::BTreeMap;

use edge_contract_core::ResourceKey;
use serde_json::Value;
use serde_json::json;
use system_tests::config::CloudCredentials;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Region every suite deploys into.
pub const REGION: &str = "northamerica-northeast2";

/// Environment suffix for test deployments.
pub const PROJECT_SUFFIX: &str = "nonprod";

/// Core module directory name.
pub const CORE_MODULE: &str = "core";

/// Demo web app module directory name.
pub const DEMO_MODULE: &str = "demo-web-app";

/// Project-level singleton module directory name.
pub const PROJECT_SINGLETON_MODULE: &str = "project-singleton";

/// Ingress VPC name in GCP.
pub const INGRESS_VPC: &str = "ingress-vpc";

/// Published Cloudflare IPv4 ranges.
pub const CLOUDFLARE_IPV4_RANGES: [&str; 15] = [
    "173.245.48.0/20",
    "103.21.244.0/22",
    "103.22.200.0/22",
    "103.31.4.0/22",
    "141.101.64.0/18",
    "108.162.192.0/18",
    "190.93.240.0/20",
    "188.114.96.0/20",
    "197.234.240.0/22",
    "198.41.128.0/17",
    "162.158.0.0/15",
    "104.16.0.0/13",
    "104.24.0.0/14",
    "172.64.0.0/13",
    "131.0.72.0/22",
];

/// Root variables the core module must declare.
pub const CORE_VARIABLES: [&str; 22] = [
    "project_suffix",
    "region",
    "cloudedge_github_repository",
    "resource_tags",
    "cloudedge_project_id",
    "enable_logging",
    "billing_account_name",
    "cloudflare_api_token",
    "cloudflare_origin_ca_key",
    "cloudflare_zone_id",
    "enable_cloudflare_proxy",
    "root_domain",
    "allowed_https_source_ranges",
    "ingress_vpc_cidr_range",
    "proxy_only_subnet_cidr_range",
    "enable_waf",
    "enable_psc",
    "enable_demo_web_app",
    "demo_web_app_project_id",
    "demo_web_app_service_name",
    "demo_web_app_subdomain_name",
    "enable_demo_web_app_psc_neg",
];

// ============================================================================
// SECTION: Module Inputs
// ============================================================================

/// Input variables for one module run.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleVars {
    /// Variable values by name.
    values: BTreeMap<String, Value>,
}

impl ModuleVars {
    /// No inputs; the module is only validated and scanned.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Baseline core inputs: demo app off, WAF on.
    #[must_use]
    pub fn core(credentials: &CloudCredentials) -> Self {
        Self {
            values: BTreeMap::new(),
        }
        .set("project_suffix", PROJECT_SUFFIX)
        .set("region", REGION)
        .set("cloudedge_github_repository", "vibetics-cloudedge")
        .set("cloudedge_project_id", credentials.project_id.as_str())
        .set("cloudflare_api_token", credentials.cloudflare_api_token.as_str())
        .set("cloudflare_zone_id", credentials.cloudflare_zone_id.as_str())
        .set("billing_account_name", "Test Billing Account")
        .set("enable_demo_web_app", false)
        .set("enable_waf", true)
    }

    /// Baseline demo-web-app inputs.
    #[must_use]
    pub fn demo(credentials: &CloudCredentials) -> Self {
        Self {
            values: BTreeMap::new(),
        }
        .set("project_suffix", PROJECT_SUFFIX)
        .set("region", REGION)
        .set("demo_web_app_project_id", credentials.project_id.as_str())
        .set("demo_web_app_service_name", "demo-web-app")
        .set("enable_demo_web_app_psc_neg", false)
    }

    /// Sets one variable.
    #[must_use]
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Sets the mandatory labels plus two custom ones.
    #[must_use]
    pub fn with_resource_tags(self) -> Self {
        self.set(
            "resource_tags",
            json!({
                "project-suffix": PROJECT_SUFFIX,
                "managed-by": "opentofu",
                "team": "infrastructure",
                "cost-center": "engineering",
            }),
        )
    }

    /// Returns the variables.
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

// ============================================================================
// SECTION: Resource Identities
// ============================================================================

/// Core WAF policy.
#[must_use]
pub fn waf_policy() -> ResourceKey {
    ResourceKey::new(None, "google_compute_region_security_policy", "edge_waf_policy")
}

/// PSC NEG created in the core module.
#[must_use]
pub fn core_psc_neg() -> ResourceKey {
    ResourceKey::new(None, "google_compute_region_network_endpoint_group", "demo_web_app_psc_neg")
}

/// PSC service attachment created in the demo-web-app module.
#[must_use]
pub fn demo_psc_attachment() -> ResourceKey {
    ResourceKey::new(None, "google_compute_service_attachment", "web_app_psc_attachment")
}

/// NAT subnet backing the PSC service attachment.
#[must_use]
pub fn demo_psc_nat_subnet() -> ResourceKey {
    ResourceKey::new(None, "google_compute_subnetwork", "psc_nat_subnet")
}
