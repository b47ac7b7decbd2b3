// crates/edge-contract-core/src/threats.rs
// ============================================================================
// Module: Threat Report
// Description: Checkov findings bucketed by severity.
// Purpose: Turn static-analysis output into a contract-checkable report.
// Dependencies: serde, serde_json, crate::plan
// ============================================================================

//! ## Overview
//! Checkov prints one report object per framework, or an array of them when
//! several frameworks ran. Each failed check becomes a [`Threat`] in the
//! bucket named by its severity. Missing or null severities count as
//! medium; anything that is not critical, high, or medium lands in low.

use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::plan::PlanError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Finding severity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must block the change.
    Critical,
    /// Serious finding.
    High,
    /// Default bucket.
    Medium,
    /// Everything else.
    Low,
}

impl Severity {
    /// Maps a raw Checkov severity label to a bucket.
    #[must_use]
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::Medium;
        };
        match label.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Self::Critical,
            "HIGH" => Self::High,
            "MEDIUM" => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Returns the bucket name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// One failed static-analysis check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threat {
    /// Check identifier such as `CKV_GCP_2`.
    #[serde(default)]
    pub check_id: String,
    /// Check name.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: String,
    /// Offending resource address.
    #[serde(default)]
    pub resource: String,
    /// Source file.
    #[serde(default)]
    pub file_path: String,
    /// First and last line of the resource block.
    #[serde(default)]
    pub line_range: Vec<u64>,
    /// Remediation guideline link.
    #[serde(default)]
    pub guideline: String,
}

/// Findings bucketed by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatReport {
    /// Parsing errors reported by the scanner.
    #[serde(default)]
    pub parsing_errors: u64,
    /// Critical findings.
    #[serde(default)]
    pub critical: Vec<Threat>,
    /// High findings.
    #[serde(default)]
    pub high: Vec<Threat>,
    /// Medium findings.
    #[serde(default)]
    pub medium: Vec<Threat>,
    /// Low findings.
    #[serde(default)]
    pub low: Vec<Threat>,
}

/// Per-severity counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    /// Critical count.
    pub critical: usize,
    /// High count.
    pub high: usize,
    /// Medium count.
    pub medium: usize,
    /// Low count.
    pub low: usize,
}

// ============================================================================
// SECTION: Conversion
// ============================================================================

impl ThreatReport {
    /// Builds a report from Checkov JSON output.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Decode`] when the document is neither a report
    /// object nor an array of report objects.
    pub fn from_checkov(document: &Value) -> Result<Self, PlanError> {
        let mut report = Self::default();
        match document {
            Value::Object(_) => report.absorb(document)?,
            Value::Array(reports) => {
                for entry in reports {
                    report.absorb(entry)?;
                }
            }
            _ => {
                return Err(PlanError::Decode(
                    "checkov output must be an object or an array of objects".to_string(),
                ));
            }
        }
        Ok(report)
    }

    /// Parses Checkov JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Decode`] for malformed JSON or unexpected shapes.
    pub fn from_checkov_str(text: &str) -> Result<Self, PlanError> {
        let document: Value =
            serde_json::from_str(text.trim()).map_err(|err| PlanError::Decode(err.to_string()))?;
        Self::from_checkov(&document)
    }

    /// Adds one framework report.
    fn absorb(&mut self, entry: &Value) -> Result<(), PlanError> {
        let Some(object) = entry.as_object() else {
            return Err(PlanError::Decode("checkov report entry must be an object".to_string()));
        };
        self.parsing_errors += object
            .get("summary")
            .and_then(|summary| summary.get("parsing_errors"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let failed = object
            .get("results")
            .and_then(|results| results.get("failed_checks"))
            .and_then(Value::as_array);
        for check in failed.into_iter().flatten() {
            let severity = Severity::from_label(check.get("severity").and_then(Value::as_str));
            self.bucket_mut(severity).push(threat_from_check(check));
        }
        Ok(())
    }

    /// Returns the bucket for a severity.
    #[must_use]
    pub fn bucket(&self, severity: Severity) -> &[Threat] {
        match severity {
            Severity::Critical => &self.critical,
            Severity::High => &self.high,
            Severity::Medium => &self.medium,
            Severity::Low => &self.low,
        }
    }

    /// Returns the mutable bucket for a severity.
    fn bucket_mut(&mut self, severity: Severity) -> &mut Vec<Threat> {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
        }
    }

    /// Returns per-severity counts.
    #[must_use]
    pub fn counts(&self) -> SeverityCounts {
        SeverityCounts {
            critical: self.critical.len(),
            high: self.high.len(),
            medium: self.medium.len(),
            low: self.low.len(),
        }
    }

    /// Returns the total number of findings.
    #[must_use]
    pub fn total(&self) -> usize {
        self.critical.len() + self.high.len() + self.medium.len() + self.low.len()
    }

    /// Counts findings at or above a severity.
    #[must_use]
    pub fn count_at_least(&self, threshold: Severity) -> usize {
        [Severity::Critical, Severity::High, Severity::Medium, Severity::Low]
            .into_iter()
            .filter(|severity| *severity <= threshold)
            .map(|severity| self.bucket(severity).len())
            .sum()
    }

    /// Returns true when any critical finding exists.
    #[must_use]
    pub fn has_critical(&self) -> bool {
        !self.critical.is_empty()
    }

    /// Renders the pull-request summary.
    #[must_use]
    pub fn summary_markdown(&self) -> String {
        let counts = self.counts();
        let mut out = String::from("# Threat Modeling Summary\n\n");
        let _ = writeln!(out, "**Critical**: {}", counts.critical);
        let _ = writeln!(out, "**High**: {}", counts.high);
        let _ = writeln!(out, "**Medium**: {}", counts.medium);
        let _ = writeln!(out, "**Low**: {}\n", counts.low);
        if !self.critical.is_empty() {
            out.push_str("## Critical Threats\n\n");
            for threat in &self.critical {
                let _ = writeln!(out, "- **{}** ({})", threat.title, threat.file_path);
                let _ = writeln!(out, "  - Resource: `{}`", threat.resource);
                let _ = writeln!(out, "  - {}\n", threat.description);
            }
        }
        out
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts one failed check.
fn threat_from_check(check: &Value) -> Threat {
    let text = |key: &str| check.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    let title = check
        .get("check_name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown Check")
        .to_string();
    let line_range = check
        .get("file_line_range")
        .and_then(Value::as_array)
        .map(|lines| lines.iter().filter_map(Value::as_u64).collect())
        .unwrap_or_default();
    Threat {
        check_id: text("check_id"),
        title,
        description: text("description"),
        resource: text("resource"),
        file_path: text("file_path"),
        line_range,
        guideline: text("guideline"),
    }
}
