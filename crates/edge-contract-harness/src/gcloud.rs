// crates/edge-contract-harness/src/gcloud.rs
// ============================================================================
// Module: Live-State Queries
// Description: Typed `gcloud` describe and list wrappers.
// Purpose: Read deployed GCP resources for post-apply assertions.
// Dependencies: edge-contract-core, edge-contract-config, serde_json
// ============================================================================

//! ## Overview
//! [`Gcloud`] runs `gcloud ... --format=json` for a fixed project and decodes
//! the result. Firewall rules come back as [`FirewallRule`] so live checks
//! share the plan-side exposure logic. [`Gcloud::exists`] turns the tool's
//! not-found report into `Ok(false)`; every other failure is an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use edge_contract_config::read_env_strict;
use edge_contract_core::AssertionOutcome;
use edge_contract_core::FirewallRule;
use edge_contract_core::PlanError;
use serde_json::Value;

use crate::error::HarnessError;
use crate::error::ToolFailure;
use crate::invoker::CommandOutput;
use crate::invoker::CommandSpec;
use crate::invoker::Invoker;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Project id variables, in resolution order.
pub const PROJECT_ENV_VARS: [&str; 4] =
    ["GOOGLE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT", "CLOUDSDK_CORE_PROJECT"];

/// Labels every managed resource must carry.
pub const REQUIRED_LABELS: [&str; 3] = ["project-suffix", "managed-by", "project"];

/// Output fragments meaning the resource does not exist.
const NOT_FOUND_MARKERS: [&str; 2] = ["was not found", "NOT_FOUND"];

// ============================================================================
// SECTION: Resource Kinds
// ============================================================================

/// GCP resource kinds the harness can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// VPC network.
    Network,
    /// Regional subnetwork.
    Subnetwork,
    /// Firewall rule.
    Firewall,
    /// Global Cloud Armor policy.
    SecurityPolicy,
    /// Regional Cloud Armor policy.
    RegionSecurityPolicy,
    /// Regional network endpoint group.
    RegionNeg,
    /// PSC service attachment.
    ServiceAttachment,
    /// Regional forwarding rule.
    ForwardingRule,
    /// Cloud Run service.
    RunService,
}

impl ResourceKind {
    /// Returns the `gcloud` command group.
    #[must_use]
    pub const fn group(self) -> &'static [&'static str] {
        match self {
            Self::Network => &["compute", "networks"],
            Self::Subnetwork => &["compute", "networks", "subnets"],
            Self::Firewall => &["compute", "firewall-rules"],
            Self::SecurityPolicy | Self::RegionSecurityPolicy => &["compute", "security-policies"],
            Self::RegionNeg => &["compute", "network-endpoint-groups"],
            Self::ServiceAttachment => &["compute", "service-attachments"],
            Self::ForwardingRule => &["compute", "forwarding-rules"],
            Self::RunService => &["run", "services"],
        }
    }

    /// Returns true when the kind needs `--region`.
    #[must_use]
    pub const fn regional(self) -> bool {
        !matches!(self, Self::Network | Self::Firewall | Self::SecurityPolicy)
    }

    /// Returns a label for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Subnetwork => "subnetwork",
            Self::Firewall => "firewall rule",
            Self::SecurityPolicy => "security policy",
            Self::RegionSecurityPolicy => "regional security policy",
            Self::RegionNeg => "network endpoint group",
            Self::ServiceAttachment => "service attachment",
            Self::ForwardingRule => "forwarding rule",
            Self::RunService => "Cloud Run service",
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// `gcloud` wrapper bound to one project.
#[derive(Clone)]
pub struct Gcloud {
    /// `gcloud` binary.
    binary: String,
    /// Process runner.
    invoker: Invoker,
    /// Project id.
    project: String,
    /// Region for regional resources.
    region: Option<String>,
}

impl Gcloud {
    /// Creates a client for `project`.
    pub fn new(invoker: Invoker, project: impl Into<String>) -> Self {
        Self {
            binary: "gcloud".to_string(),
            invoker,
            project: project.into(),
            region: None,
        }
    }

    /// Creates a client for the project named in the environment.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Precondition`] when no project variable is set.
    pub fn from_env(invoker: Invoker) -> Result<Self, HarnessError> {
        Ok(Self::new(invoker, resolve_project()?))
    }

    /// Overrides the binary.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets the region for regional resources.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Returns the project id.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Describes a resource as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error when the command fails or prints invalid JSON.
    pub fn describe(&self, kind: ResourceKind, name: &str) -> Result<Value, HarnessError> {
        let output = self.invoker.run(&self.describe_spec(kind, name)?)?;
        decode_json(&output.stdout)
    }

    /// Returns whether a resource exists.
    ///
    /// # Errors
    ///
    /// Returns an error for failures other than not-found.
    pub fn exists(&self, kind: ResourceKind, name: &str) -> Result<bool, HarnessError> {
        let spec = self.describe_spec(kind, name)?;
        let output = self.invoker.run_unchecked(&spec)?;
        classify_existence(&spec, output)
    }

    /// Describes a firewall rule.
    ///
    /// # Errors
    ///
    /// Returns an error when the rule cannot be read or decoded.
    pub fn describe_firewall(&self, name: &str) -> Result<FirewallRule, HarnessError> {
        let document = self.describe(ResourceKind::Firewall, name)?;
        FirewallRule::from_live(&document)
            .map_err(|err| HarnessError::from(PlanError::Decode(err.to_string())))
    }

    /// Describes a VPC network.
    ///
    /// # Errors
    ///
    /// Returns an error when the network cannot be read.
    pub fn describe_network(&self, name: &str) -> Result<Value, HarnessError> {
        self.describe(ResourceKind::Network, name)
    }

    /// Describes a subnetwork.
    ///
    /// # Errors
    ///
    /// Returns an error when the subnetwork cannot be read.
    pub fn describe_subnetwork(&self, name: &str) -> Result<Value, HarnessError> {
        self.describe(ResourceKind::Subnetwork, name)
    }

    /// Describes a regional network endpoint group.
    ///
    /// # Errors
    ///
    /// Returns an error when the NEG cannot be read.
    pub fn describe_region_neg(&self, name: &str) -> Result<Value, HarnessError> {
        self.describe(ResourceKind::RegionNeg, name)
    }

    /// Describes a PSC service attachment.
    ///
    /// # Errors
    ///
    /// Returns an error when the attachment cannot be read.
    pub fn describe_service_attachment(&self, name: &str) -> Result<Value, HarnessError> {
        self.describe(ResourceKind::ServiceAttachment, name)
    }

    /// Returns the labels on a resource (empty when it has none).
    ///
    /// # Errors
    ///
    /// Returns an error when the resource cannot be read or labels are not
    /// strings.
    pub fn labels_of(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<BTreeMap<String, String>, HarnessError> {
        labels_from(&self.describe(kind, name)?)
    }

    /// Lists firewall rules, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns an error when the list cannot be read or decoded.
    pub fn list_firewall_rules(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<FirewallRule>, HarnessError> {
        let mut spec = self.base_spec(&["compute", "firewall-rules", "list"]);
        if let Some(filter) = filter {
            spec = spec.arg(format!("--filter={filter}"));
        }
        let output = self.invoker.run(&spec.arg("--format=json"))?;
        let Value::Array(items) = decode_json(&output.stdout)? else {
            return Err(PlanError::Decode("firewall list is not an array".to_string()).into());
        };
        items
            .iter()
            .map(|item| {
                FirewallRule::from_live(item)
                    .map_err(|err| HarnessError::from(PlanError::Decode(err.to_string())))
            })
            .collect()
    }

    /// Returns the URL of a Cloud Run service.
    ///
    /// # Errors
    ///
    /// Returns an error when the service cannot be read or has no URL.
    pub fn run_service_url(&self, name: &str) -> Result<String, HarnessError> {
        let document = self.describe(ResourceKind::RunService, name)?;
        document
            .pointer("/status/url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                HarnessError::from(PlanError::Decode(format!("service {name} has no status.url")))
            })
    }

    /// Returns asset names carrying `label=value`.
    ///
    /// # Errors
    ///
    /// Returns an error when the asset search fails.
    pub fn search_labeled_assets(
        &self,
        label: &str,
        value: &str,
    ) -> Result<Vec<String>, HarnessError> {
        let spec = CommandSpec::new(self.binary.clone()).args([
            "asset".to_string(),
            "search-all-resources".to_string(),
            format!("--project={}", self.project),
            format!("--filter=labels.{label}={value}"),
            "--format=value(name)".to_string(),
        ]);
        let output = self.invoker.run(&spec)?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Builds `gcloud <group> describe <name> --project=.. [--region=..] --format=json`.
    fn describe_spec(&self, kind: ResourceKind, name: &str) -> Result<CommandSpec, HarnessError> {
        let mut group: Vec<&str> = kind.group().to_vec();
        group.push("describe");
        let mut spec = self.base_spec(&group).arg(name);
        if kind.regional() {
            let region = self.region.as_deref().ok_or_else(|| {
                HarnessError::precondition(format!("{} lookups need a region", kind.as_str()))
            })?;
            spec = spec.arg(format!("--region={region}"));
        }
        Ok(spec.arg("--format=json"))
    }

    /// Builds a command for `group` scoped to the project.
    fn base_spec(&self, group: &[&str]) -> CommandSpec {
        CommandSpec::new(self.binary.clone())
            .args(group.iter().copied())
            .arg(format!("--project={}", self.project))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the project id from the environment.
///
/// # Errors
///
/// Returns [`HarnessError::Precondition`] when no variable is set or a value
/// is not valid UTF-8.
pub fn resolve_project() -> Result<String, HarnessError> {
    for name in PROJECT_ENV_VARS {
        let value = read_env_strict(name).map_err(HarnessError::Precondition)?;
        if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
            return Ok(value.trim().to_string());
        }
    }
    Err(HarnessError::precondition(format!(
        "set one of {} to the GCP project id",
        PROJECT_ENV_VARS.join(", ")
    )))
}

/// Maps a describe result to existence.
fn classify_existence(spec: &CommandSpec, output: CommandOutput) -> Result<bool, HarnessError> {
    if output.success() {
        return Ok(true);
    }
    if NOT_FOUND_MARKERS.iter().any(|marker| output.combined.contains(marker)) {
        return Ok(false);
    }
    Err(ToolFailure {
        command: spec.display(),
        status: output.status,
        output: output.combined,
    }
    .into())
}

/// Decodes `gcloud` JSON output.
fn decode_json(text: &str) -> Result<Value, HarnessError> {
    serde_json::from_str(text).map_err(|err| HarnessError::from(PlanError::Decode(err.to_string())))
}

/// Extracts string labels from a describe document.
///
/// # Errors
///
/// Returns an error when `labels` is present but not a string map.
pub fn labels_from(document: &Value) -> Result<BTreeMap<String, String>, HarnessError> {
    let Some(labels) = document.get("labels") else {
        return Ok(BTreeMap::new());
    };
    let Value::Object(map) = labels else {
        return Err(PlanError::Decode("labels is not an object".to_string()).into());
    };
    map.iter()
        .map(|(key, value)| {
            value.as_str().map(|text| (key.clone(), text.to_string())).ok_or_else(|| {
                HarnessError::from(PlanError::Decode(format!("label {key} is not a string")))
            })
        })
        .collect()
}

/// Checks that the mandatory labels are present with the expected values.
#[must_use]
pub fn labels_outcome(
    labels: &BTreeMap<String, String>,
    expected: &BTreeMap<&str, &str>,
) -> AssertionOutcome {
    let mut problems: Vec<String> = REQUIRED_LABELS
        .iter()
        .filter(|label| !labels.contains_key(**label))
        .map(|label| format!("missing label {label}"))
        .collect();
    for (label, value) in expected {
        match labels.get(*label) {
            Some(actual) if actual == value => {}
            Some(actual) => problems.push(format!("label {label} is {actual}, expected {value}")),
            None if REQUIRED_LABELS.contains(label) => {}
            None => problems.push(format!("missing label {label}")),
        }
    }
    if problems.is_empty() { AssertionOutcome::Pass } else { AssertionOutcome::fail(problems.join("; ")) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
