// crates/edge-contract-core/src/security.rs
// ============================================================================
// Module: Exposure Invariants
// Description: Firewall rule views and public-exposure detection.
// Purpose: Prevent ingress rules from opening ports to the whole internet.
// Dependencies: crate::attributes, crate::index, serde, serde_json
// ============================================================================

//! ## Overview
//! Firewall rules appear in two shapes: planned `google_compute_firewall`
//! states (`source_ranges`, `allow[].protocol`) and live `gcloud` describe
//! documents (`sourceRanges`, `allowed[].IPProtocol`). Both decode into one
//! [`FirewallRule`] view so the same exposure logic guards plans and live
//! infrastructure.
//!
//! Invariant: no enabled ingress rule that allows a guarded TCP port may list
//! a range from [`PUBLIC_SOURCE_RANGES`]. Rules without a direction are
//! treated as ingress and rules without ports allow every port.
//!
//! A planned rule whose `source_ranges` are unknown until apply cannot be
//! judged from the plan. It is reported as undecided and the outcome is
//! [`AssertionOutcome::Unknown`], never a pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::assertions::AssertionOutcome;
use crate::attributes::AttributeError;
use crate::attributes::Attributes;
use crate::attributes::json_type_name;
use crate::index::PlanIndex;
use crate::plan::ResourceChange;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Source ranges that mean "anywhere".
pub const PUBLIC_SOURCE_RANGES: [&str; 2] = ["0.0.0.0/0", "::/0"];
/// HTTPS port guarded after every apply.
pub const HTTPS_PORT: u16 = 443;
/// SSH port (CIS GCP 3.6).
pub const SSH_PORT: u16 = 22;
/// RDP port (CIS GCP 3.7).
pub const RDP_PORT: u16 = 3389;
/// Resource type for VPC firewall rules.
pub const FIREWALL_TYPE: &str = "google_compute_firewall";

/// Field names for one firewall document shape.
struct FieldNames {
    /// Traffic direction field.
    direction: &'static str,
    /// Disabled flag field.
    disabled: &'static str,
    /// Network field.
    network: &'static str,
    /// Source range list field.
    source_ranges: &'static str,
    /// Allow block list field.
    allowed: &'static str,
    /// Protocol field inside an allow block.
    protocol: &'static str,
    /// Port list field inside an allow block.
    ports: &'static str,
}

/// Planned state field names.
const PLAN_FIELDS: FieldNames = FieldNames {
    direction: "direction",
    disabled: "disabled",
    network: "network",
    source_ranges: "source_ranges",
    allowed: "allow",
    protocol: "protocol",
    ports: "ports",
};

/// Live `gcloud compute firewall-rules describe` field names.
const LIVE_FIELDS: FieldNames = FieldNames {
    direction: "direction",
    disabled: "disabled",
    network: "network",
    source_ranges: "sourceRanges",
    allowed: "allowed",
    protocol: "IPProtocol",
    ports: "ports",
};

// ============================================================================
// SECTION: Firewall View
// ============================================================================

/// Protocol and ports allowed by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowedTraffic {
    /// Protocol name or number (`tcp`, `all`, `6`).
    pub protocol: String,
    /// Port entries (`443`, `8000-9000`); empty means all ports.
    pub ports: Vec<String>,
}

impl AllowedTraffic {
    /// Returns true when this block admits the TCP port.
    #[must_use]
    pub fn admits_tcp(&self, port: u16) -> bool {
        let protocol = self.protocol.trim();
        let tcp = protocol.eq_ignore_ascii_case("tcp")
            || protocol.eq_ignore_ascii_case("all")
            || protocol == "6";
        tcp && (self.ports.is_empty() || self.ports.iter().any(|entry| port_matches(entry, port)))
    }
}

/// Normalized firewall rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirewallRule {
    /// Plan address or live rule name.
    pub name: String,
    /// Network reference when known.
    pub network: Option<String>,
    /// `INGRESS` or `EGRESS`.
    pub direction: String,
    /// Disabled flag.
    pub disabled: bool,
    /// Source CIDR ranges.
    pub source_ranges: Vec<String>,
    /// Allow blocks.
    pub allowed: Vec<AllowedTraffic>,
}

impl FirewallRule {
    /// Builds a view from a planned firewall change.
    ///
    /// Returns `Ok(None)` for changes without a planned state.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] when fields have unexpected types.
    pub fn from_plan(change: &ResourceChange) -> Result<Option<Self>, AttributeError> {
        change.attributes().map(|attributes| Self::decode(attributes, &PLAN_FIELDS)).transpose()
    }

    /// Builds a view from a live describe document.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] when fields have unexpected types.
    pub fn from_live(document: &Value) -> Result<Self, AttributeError> {
        let name = document.get("name").and_then(Value::as_str).unwrap_or("firewall-rule");
        Self::decode(Attributes::new(name, document), &LIVE_FIELDS)
    }

    /// Decodes a rule using the given field names.
    fn decode(attributes: Attributes<'_>, fields: &FieldNames) -> Result<Self, AttributeError> {
        let direction = optional_str(attributes, fields.direction)?.unwrap_or("INGRESS");
        let disabled = match attributes.find(fields.disabled)? {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => return Err(mismatch(attributes, fields.disabled, "boolean", other)),
        };
        let network = optional_str(attributes, fields.network)?.map(str::to_string);
        let source_ranges = optional_string_list(attributes, fields.source_ranges)?;
        let mut allowed = Vec::new();
        if let Some(blocks) = optional_array(attributes, fields.allowed)? {
            for position in 0..blocks.len() {
                let path = format!("{}[{position}]", fields.allowed);
                let protocol = attributes.get_str(&format!("{path}.{}", fields.protocol))?;
                let ports = optional_string_list(attributes, &format!("{path}.{}", fields.ports))?;
                allowed.push(AllowedTraffic {
                    protocol: protocol.to_string(),
                    ports,
                });
            }
        }
        Ok(Self {
            name: attributes.address().to_string(),
            network,
            direction: direction.to_string(),
            disabled,
            source_ranges,
            allowed,
        })
    }

    /// Returns true for ingress rules.
    #[must_use]
    pub fn is_ingress(&self) -> bool {
        self.direction.eq_ignore_ascii_case("INGRESS")
    }

    /// Returns true when any allow block admits the TCP port.
    #[must_use]
    pub fn allows_tcp_port(&self, port: u16) -> bool {
        self.allowed.iter().any(|block| block.admits_tcp(port))
    }

    /// Returns the source ranges that mean "anywhere".
    #[must_use]
    pub fn public_ranges(&self) -> Vec<&str> {
        self.source_ranges
            .iter()
            .map(String::as_str)
            .filter(|range| PUBLIC_SOURCE_RANGES.contains(range))
            .collect()
    }

    /// Returns true when the rule opens the TCP port to the internet.
    #[must_use]
    pub fn exposes_publicly(&self, port: u16) -> bool {
        !self.disabled
            && self.is_ingress()
            && self.allows_tcp_port(port)
            && !self.public_ranges().is_empty()
    }
}

/// One rule that opens a guarded port to the internet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExposureViolation {
    /// Offending rule.
    pub rule: String,
    /// Guarded port.
    pub port: u16,
    /// Public ranges found on the rule.
    pub ranges: Vec<String>,
}

impl fmt::Display for ExposureViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} allows tcp:{} from {}", self.rule, self.port, self.ranges.join(", "))
    }
}

// ============================================================================
// SECTION: Invariants
// ============================================================================

/// Planned firewall rules checked against one guarded port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExposureScan {
    /// Rules that open the port to the internet.
    pub violations: Vec<ExposureViolation>,
    /// Rules that admit the port but whose source ranges are unknown until
    /// apply.
    pub undecided: Vec<String>,
}

/// Scans every planned firewall rule for public exposure of `port`.
///
/// # Errors
///
/// Returns [`AttributeError`] when a planned firewall has malformed fields.
pub fn scan_exposure(index: &PlanIndex, port: u16) -> Result<ExposureScan, AttributeError> {
    let mut scan = ExposureScan::default();
    for change in index.of_type(FIREWALL_TYPE) {
        if !change.planned_to_exist() {
            continue;
        }
        let Some(rule) = FirewallRule::from_plan(change)? else {
            continue;
        };
        if let Some(violation) = violation_for(&rule, port) {
            scan.violations.push(violation);
        } else if change.is_unknown(PLAN_FIELDS.source_ranges)
            && !rule.disabled
            && rule.is_ingress()
            && rule.allows_tcp_port(port)
        {
            scan.undecided.push(rule.name);
        }
    }
    Ok(scan)
}

/// Returns every planned firewall rule that exposes `port` publicly.
///
/// # Errors
///
/// Returns [`AttributeError`] when a planned firewall has malformed fields.
pub fn public_exposure_violations(
    index: &PlanIndex,
    port: u16,
) -> Result<Vec<ExposureViolation>, AttributeError> {
    Ok(scan_exposure(index, port)?.violations)
}

/// Returns a violation when a rule exposes the port publicly.
#[must_use]
pub fn violation_for(rule: &FirewallRule, port: u16) -> Option<ExposureViolation> {
    rule.exposes_publicly(port).then(|| ExposureViolation {
        rule: rule.name.clone(),
        port,
        ranges: rule.public_ranges().into_iter().map(str::to_string).collect(),
    })
}

/// Evaluates the public-exposure invariant for one port as an outcome.
///
/// Violations fail; otherwise undecided rules make the outcome unknown.
#[must_use]
pub fn exposure_outcome(index: &PlanIndex, port: u16) -> AssertionOutcome {
    let scan = match scan_exposure(index, port) {
        Ok(scan) => scan,
        Err(err) => return AssertionOutcome::fail(err.to_string()),
    };
    if !scan.violations.is_empty() {
        let rendered: Vec<String> = scan.violations.iter().map(ToString::to_string).collect();
        return AssertionOutcome::fail(rendered.join("; "));
    }
    if scan.undecided.is_empty() {
        return AssertionOutcome::Pass;
    }
    AssertionOutcome::unknown(format!(
        "source_ranges unknown until apply for {}; tcp:{port} exposure cannot be decided from the plan",
        scan.undecided.join(", ")
    ))
}

/// Evaluates the CIS administrative-port checks (SSH and RDP).
#[must_use]
pub fn admin_port_outcomes(index: &PlanIndex) -> Vec<(String, AssertionOutcome)> {
    vec![
        (
            "CIS 3.6: SSH (tcp:22) is not open to the internet".to_string(),
            exposure_outcome(index, SSH_PORT),
        ),
        (
            "CIS 3.7: RDP (tcp:3389) is not open to the internet".to_string(),
            exposure_outcome(index, RDP_PORT),
        ),
    ]
}

/// Compares source ranges as unordered multisets.
#[must_use]
pub fn source_ranges_match(rule: &FirewallRule, expected: &[&str]) -> AssertionOutcome {
    let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
    for range in &rule.source_ranges {
        *counts.entry(range.as_str()).or_default() += 1;
    }
    for range in expected {
        *counts.entry(*range).or_default() -= 1;
    }
    let unexpected: Vec<&str> =
        counts.iter().filter(|(_, count)| **count > 0).map(|(range, _)| *range).collect();
    let missing: Vec<&str> =
        counts.iter().filter(|(_, count)| **count < 0).map(|(range, _)| *range).collect();
    if unexpected.is_empty() && missing.is_empty() {
        return AssertionOutcome::Pass;
    }
    AssertionOutcome::fail(format!(
        "{}: source ranges differ (unexpected: [{}], missing: [{}])",
        rule.name,
        unexpected.join(", "),
        missing.join(", ")
    ))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when a port entry (`443` or `400-500`) covers `port`.
fn port_matches(entry: &str, port: u16) -> bool {
    match entry.split_once('-') {
        Some((low, high)) => match (low.trim().parse::<u16>(), high.trim().parse::<u16>()) {
            (Ok(low), Ok(high)) => (low..=high).contains(&port),
            _ => false,
        },
        None => entry.trim().parse::<u16>().is_ok_and(|value| value == port),
    }
}

/// Builds a type mismatch error.
fn mismatch(
    attributes: Attributes<'_>,
    path: &str,
    expected: &'static str,
    actual: &Value,
) -> AttributeError {
    AttributeError::TypeMismatch {
        address: attributes.address().to_string(),
        path: path.to_string(),
        expected,
        actual: json_type_name(actual),
    }
}

/// Reads an optional string (absent or null yields `None`).
fn optional_str<'a>(
    attributes: Attributes<'a>,
    path: &str,
) -> Result<Option<&'a str>, AttributeError> {
    match attributes.find(path)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.as_str())),
        Some(other) => Err(mismatch(attributes, path, "string", other)),
    }
}

/// Reads an optional array (absent or null yields `None`).
fn optional_array<'a>(
    attributes: Attributes<'a>,
    path: &str,
) -> Result<Option<&'a [Value]>, AttributeError> {
    match attributes.find(path)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.as_slice())),
        Some(other) => Err(mismatch(attributes, path, "array", other)),
    }
}

/// Reads an optional list of strings (absent or null yields empty).
fn optional_string_list(
    attributes: Attributes<'_>,
    path: &str,
) -> Result<Vec<String>, AttributeError> {
    if optional_array(attributes, path)?.is_none() {
        return Ok(Vec::new());
    }
    Ok(attributes.get_string_list(path)?.into_iter().map(str::to_string).collect())
}
