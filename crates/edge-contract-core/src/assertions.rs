// crates/edge-contract-core/src/assertions.rs
// ============================================================================
// Module: Contract Assertions
// Description: Declarative predicates over indexed plans and output values.
// Purpose: Report pass/fail with messages naming resource, path, and values.
// Dependencies: crate::index, crate::comparator, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ContractAssertion`] states one verifiable fact about a plan: a
//! resource exists or is absent, an attribute equals or belongs to a set, a
//! resource exists exactly when a toggle variable is true, or a collection
//! never holds a forbidden value. Assertions are stateless and serializable,
//! so whole contracts can live in TOML or JSON files as a [`ContractSuite`].
//!
//! Attribute assertions refuse to guess: a selector without a module that
//! matches resources in several modules fails as ambiguous.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::checks::Checks;
use crate::comparator::Comparator;
use crate::comparator::TriState;
use crate::comparator::evaluate_comparator;
use crate::index::PlanIndex;
use crate::outputs::Outputs;
use crate::outputs::render_value;
pub use crate::plan::DeclarationKind;
use crate::plan::ResourceChange;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of evaluating one assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssertionOutcome {
    /// The assertion holds.
    Pass,
    /// The assertion does not hold.
    Fail {
        /// Expected-versus-actual description.
        message: String,
    },
    /// The plan cannot decide the assertion before apply.
    Unknown {
        /// What is unknown and why it matters.
        message: String,
    },
}

impl AssertionOutcome {
    /// Builds a failing outcome.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
        }
    }

    /// Builds an undecided outcome.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Maps a `Result` into an outcome.
    #[must_use]
    pub fn from_result(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::Pass,
            Err(message) => Self::Fail {
                message,
            },
        }
    }

    /// Returns true for [`AssertionOutcome::Pass`].
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Returns true for [`AssertionOutcome::Fail`].
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }

    /// Returns the `PASS`/`FAIL`/`UNKNOWN` label used in reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail {
                ..
            } => "FAIL",
            Self::Unknown {
                ..
            } => "UNKNOWN",
        }
    }

    /// Returns the failure or unknown message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Pass => None,
            Self::Fail {
                message,
            }
            | Self::Unknown {
                message,
            } => Some(message),
        }
    }
}

/// Folds per-resource failures into one outcome.
fn outcome_from(failures: Vec<String>) -> AssertionOutcome {
    if failures.is_empty() {
        AssertionOutcome::Pass
    } else {
        AssertionOutcome::fail(failures.join("; "))
    }
}

// ============================================================================
// SECTION: Selectors
// ============================================================================

/// Identifies resources by type, name, and optional module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSelector {
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource name.
    pub name: String,
    /// Module name (`core` or `module.core`); unset matches any module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

impl ResourceSelector {
    /// Selects a resource in any module.
    #[must_use]
    pub fn new(resource_type: &str, name: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            module: None,
        }
    }

    /// Restricts the selector to one module.
    #[must_use]
    pub fn in_module(mut self, module: &str) -> Self {
        self.module = Some(module.to_string());
        self
    }

    /// Returns matching changes that exist after apply.
    fn existing<'a>(&self, index: &'a PlanIndex) -> Vec<&'a ResourceChange> {
        self.matches(index).into_iter().filter(|change| change.planned_to_exist()).collect()
    }

    /// Returns all matching changes.
    fn matches<'a>(&self, index: &'a PlanIndex) -> Vec<&'a ResourceChange> {
        match &self.module {
            Some(module) => {
                index.find_in_module(Some(module.as_str()), &self.resource_type, &self.name)
            }
            None => index.find(&self.resource_type, &self.name),
        }
    }

    /// Resolves the selector for attribute checks.
    fn resolve<'a>(&self, index: &'a PlanIndex) -> Result<Vec<&'a ResourceChange>, String> {
        let changes = self.matches(index);
        if changes.is_empty() {
            return Err(format!("{self} not found in plan"));
        }
        if self.module.is_none() {
            let modules: BTreeSet<Option<String>> =
                changes.iter().map(|change| change.identity.module_address()).collect();
            if modules.len() > 1 {
                let addresses: Vec<&str> =
                    changes.iter().map(|change| change.address.as_str()).collect();
                return Err(format!(
                    "{self} is ambiguous across modules ({}); set a module",
                    addresses.join(", ")
                ));
            }
        }
        let existing: Vec<&ResourceChange> =
            changes.into_iter().filter(|change| change.planned_to_exist()).collect();
        if existing.is_empty() {
            return Err(format!("{self} is planned for deletion"));
        }
        Ok(existing)
    }
}

impl fmt::Display for ResourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(module) = &self.module {
            write!(f, "{}.", crate::plan::normalize_module(module))?;
        }
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

// ============================================================================
// SECTION: Assertions
// ============================================================================

/// One contract predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContractAssertion {
    /// The resource exists after apply.
    ResourcePresent {
        /// Selected resource.
        target: ResourceSelector,
    },
    /// The resource does not exist after apply.
    ResourceAbsent {
        /// Selected resource.
        target: ResourceSelector,
    },
    /// No resource of the type exists after apply.
    NoResourceOfType {
        /// Type name, or substring when `substring` is set.
        resource_type: String,
        /// Match any type containing `resource_type`.
        #[serde(default)]
        substring: bool,
    },
    /// An attribute equals an expected JSON value.
    AttributeEquals {
        /// Selected resource.
        target: ResourceSelector,
        /// Attribute path.
        path: String,
        /// Expected value.
        expected: Value,
    },
    /// An attribute is one of an enumerated set of values.
    AttributeInSet {
        /// Selected resource.
        target: ResourceSelector,
        /// Attribute path.
        path: String,
        /// Accepted values.
        allowed: Vec<Value>,
    },
    /// An attribute is a non-empty string, array, or object.
    AttributeNonEmpty {
        /// Selected resource.
        target: ResourceSelector,
        /// Attribute path.
        path: String,
    },
    /// An attribute satisfies an arbitrary comparator.
    AttributeCompare {
        /// Selected resource.
        target: ResourceSelector,
        /// Attribute path.
        path: String,
        /// Comparison to apply.
        comparator: Comparator,
        /// Expected operand, when the comparator needs one.
        #[serde(default)]
        expected: Option<Value>,
    },
    /// The resource exists exactly when a boolean input variable is true.
    ConditionalPresence {
        /// Selected resource.
        target: ResourceSelector,
        /// Toggle variable name, e.g. `enable_waf`.
        toggle: String,
    },
    /// No resource of a type holds a forbidden value at a path.
    ForbiddenValue {
        /// Resource type to scan.
        resource_type: String,
        /// Attribute path.
        path: String,
        /// Value that must never appear.
        forbidden: Value,
    },
    /// A root output equals an expected value.
    OutputEquals {
        /// Output name.
        output: String,
        /// Expected value; strings also match the rendered scalar.
        expected: Value,
    },
    /// A root output is set and non-empty.
    OutputNonEmpty {
        /// Output name.
        output: String,
    },
    /// The configuration declares every named item.
    Declared {
        /// Declaration kind.
        item: DeclarationKind,
        /// Required names.
        names: Vec<String>,
    },
}

impl ContractAssertion {
    /// Evaluates the assertion.
    ///
    /// `outputs` holds applied outputs; when absent, output assertions read
    /// the plan's planned output values.
    #[must_use]
    pub fn evaluate(&self, index: &PlanIndex, outputs: Option<&Outputs>) -> AssertionOutcome {
        match self {
            Self::ResourcePresent {
                target,
            } => {
                if target.existing(index).is_empty() {
                    AssertionOutcome::fail(format!("expected {target} to be present in plan"))
                } else {
                    AssertionOutcome::Pass
                }
            }
            Self::ResourceAbsent {
                target,
            } => {
                let found = target.existing(index);
                if found.is_empty() {
                    AssertionOutcome::Pass
                } else {
                    AssertionOutcome::fail(format!(
                        "expected {target} to be absent, found {}",
                        addresses(&found)
                    ))
                }
            }
            Self::NoResourceOfType {
                resource_type,
                substring,
            } => {
                let found: Vec<&ResourceChange> = index
                    .iter()
                    .filter(|change| change.planned_to_exist())
                    .filter(|change| {
                        if *substring {
                            change.resource_type().contains(resource_type.as_str())
                        } else {
                            change.resource_type() == resource_type
                        }
                    })
                    .collect();
                if found.is_empty() {
                    AssertionOutcome::Pass
                } else {
                    AssertionOutcome::fail(format!(
                        "forbidden resource type {resource_type} planned: {}",
                        addresses(&found)
                    ))
                }
            }
            Self::AttributeEquals {
                target,
                path,
                expected,
            } => compare_attribute(index, target, path, Comparator::Equals, Some(expected)),
            Self::AttributeInSet {
                target,
                path,
                allowed,
            } => {
                let set = Value::Array(allowed.clone());
                compare_attribute(index, target, path, Comparator::InSet, Some(&set))
            }
            Self::AttributeNonEmpty {
                target,
                path,
            } => compare_attribute(index, target, path, Comparator::NonEmpty, None),
            Self::AttributeCompare {
                target,
                path,
                comparator,
                expected,
            } => compare_attribute(index, target, path, *comparator, expected.as_ref()),
            Self::ConditionalPresence {
                target,
                toggle,
            } => conditional_presence(index, target, toggle),
            Self::ForbiddenValue {
                resource_type,
                path,
                forbidden,
            } => forbidden_value(index, resource_type, path, forbidden),
            Self::OutputEquals {
                output,
                expected,
            } => match output_value(index, outputs, output) {
                Err(message) => AssertionOutcome::fail(message),
                Ok(actual) => {
                    let rendered_match = matches!(
                        expected,
                        Value::String(text) if render_value(actual) == *text
                    );
                    if actual == expected || rendered_match {
                        AssertionOutcome::Pass
                    } else {
                        AssertionOutcome::fail(format!(
                            "output {output}: expected {expected}, got {actual}"
                        ))
                    }
                }
            },
            Self::OutputNonEmpty {
                output,
            } => match output_value(index, outputs, output) {
                Err(message) => AssertionOutcome::fail(message),
                Ok(actual) => {
                    if render_value(actual).trim().is_empty() || is_empty_collection(actual) {
                        AssertionOutcome::fail(format!("output {output} is empty"))
                    } else {
                        AssertionOutcome::Pass
                    }
                }
            },
            Self::Declared {
                item,
                names,
            } => {
                let declared = index.plan().declared(*item);
                let missing: Vec<&str> = names
                    .iter()
                    .filter(|name| !declared.contains(name.as_str()))
                    .map(String::as_str)
                    .collect();
                if missing.is_empty() {
                    AssertionOutcome::Pass
                } else {
                    AssertionOutcome::fail(format!(
                        "configuration does not declare {} {}",
                        declaration_label(*item),
                        missing.join(", ")
                    ))
                }
            }
        }
    }

    /// Returns a human-readable label.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::ResourcePresent {
                target,
            } => format!("{target} is present"),
            Self::ResourceAbsent {
                target,
            } => format!("{target} is absent"),
            Self::NoResourceOfType {
                resource_type,
                substring,
            } => {
                if *substring {
                    format!("no resource type containing {resource_type}")
                } else {
                    format!("no {resource_type} resources")
                }
            }
            Self::AttributeEquals {
                target,
                path,
                expected,
            } => format!("{target}.{path} equals {expected}"),
            Self::AttributeInSet {
                target,
                path,
                allowed,
            } => format!("{target}.{path} is one of {}", Value::Array(allowed.clone())),
            Self::AttributeNonEmpty {
                target,
                path,
            } => format!("{target}.{path} is non-empty"),
            Self::AttributeCompare {
                target,
                path,
                comparator,
                expected,
            } => match expected {
                Some(expected) => format!("{target}.{path} {} {expected}", comparator.as_str()),
                None => format!("{target}.{path} {}", comparator.as_str()),
            },
            Self::ConditionalPresence {
                target,
                toggle,
            } => format!("{target} exists iff {toggle}"),
            Self::ForbiddenValue {
                resource_type,
                path,
                forbidden,
            } => format!("no {resource_type}.{path} contains {forbidden}"),
            Self::OutputEquals {
                output,
                expected,
            } => format!("output {output} equals {expected}"),
            Self::OutputNonEmpty {
                output,
            } => format!("output {output} is non-empty"),
            Self::Declared {
                item,
                names,
            } => format!("declares {} {}", declaration_label(*item), names.join(", ")),
        }
    }
}

// ============================================================================
// SECTION: Suites
// ============================================================================

/// Named collection of assertions loaded from a contract file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSuite {
    /// Suite name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Assertions in evaluation order.
    pub assertions: Vec<ContractAssertion>,
}

impl ContractSuite {
    /// Evaluates every assertion into an accumulator.
    #[must_use]
    pub fn run(&self, index: &PlanIndex, outputs: Option<&Outputs>) -> Checks {
        let mut checks = Checks::new(&self.name);
        for assertion in &self.assertions {
            checks.assert(index, outputs, assertion);
        }
        checks
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Joins change addresses for messages.
fn addresses(changes: &[&ResourceChange]) -> String {
    let addresses: Vec<&str> = changes.iter().map(|change| change.address.as_str()).collect();
    addresses.join(", ")
}

/// Renders an optional value for messages.
fn shown(value: Option<&Value>) -> String {
    value.map_or_else(|| "<unset>".to_string(), ToString::to_string)
}

/// Applies a comparator to an attribute of every selected resource.
fn compare_attribute(
    index: &PlanIndex,
    target: &ResourceSelector,
    path: &str,
    comparator: Comparator,
    expected: Option<&Value>,
) -> AssertionOutcome {
    let changes = match target.resolve(index) {
        Ok(changes) => changes,
        Err(message) => return AssertionOutcome::fail(message),
    };
    let mut failures = Vec::new();
    for change in changes {
        let Some(attributes) = change.attributes() else {
            failures.push(format!("{}: no planned state ({})", change.address, change.action));
            continue;
        };
        let actual = match attributes.find(path) {
            Ok(actual) => actual,
            Err(err) => {
                failures.push(err.to_string());
                continue;
            }
        };
        if actual.is_none() && change.is_unknown(path) {
            failures.push(format!("{}: {path} is known only after apply", change.address));
            continue;
        }
        match evaluate_comparator(comparator, expected, actual) {
            TriState::True => {}
            TriState::False => failures.push(format!(
                "{}: {path} = {} does not satisfy {} {}",
                change.address,
                shown(actual),
                comparator.as_str(),
                shown(expected)
            )),
            TriState::Unknown => failures.push(format!(
                "{}: {path} = {} cannot be compared with {} {}",
                change.address,
                shown(actual),
                comparator.as_str(),
                shown(expected)
            )),
        }
    }
    outcome_from(failures)
}

/// Evaluates presence against a boolean toggle variable.
fn conditional_presence(
    index: &PlanIndex,
    target: &ResourceSelector,
    toggle: &str,
) -> AssertionOutcome {
    let enabled = match index.plan().variable(toggle) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) if text == "true" => true,
        Some(Value::String(text)) if text == "false" => false,
        Some(other) => {
            return AssertionOutcome::fail(format!("toggle {toggle} is not a boolean: {other}"));
        }
        None => {
            return AssertionOutcome::fail(format!("toggle {toggle} is not set in the plan"));
        }
    };
    let present = !target.existing(index).is_empty();
    if present == enabled {
        AssertionOutcome::Pass
    } else if enabled {
        AssertionOutcome::fail(format!("{toggle} = true but {target} is not planned"))
    } else {
        AssertionOutcome::fail(format!("{toggle} = false but {target} is planned"))
    }
}

/// Scans every resource of a type for a forbidden value.
fn forbidden_value(
    index: &PlanIndex,
    resource_type: &str,
    path: &str,
    forbidden: &Value,
) -> AssertionOutcome {
    let mut failures = Vec::new();
    for change in index.of_type(resource_type) {
        let Some(attributes) = change.attributes() else {
            continue;
        };
        match attributes.find(path) {
            Ok(Some(Value::Array(items))) if items.contains(forbidden) => {
                failures.push(format!("{}: {path} contains {forbidden}", change.address));
            }
            Ok(Some(value)) if value == forbidden => {
                failures.push(format!("{}: {path} is {forbidden}", change.address));
            }
            Ok(_) => {}
            Err(err) => failures.push(err.to_string()),
        }
    }
    outcome_from(failures)
}

/// Resolves an output from applied outputs or planned output changes.
fn output_value<'a>(
    index: &'a PlanIndex,
    outputs: Option<&'a Outputs>,
    name: &str,
) -> Result<&'a Value, String> {
    if let Some(outputs) = outputs {
        return outputs.get(name).ok_or_else(|| format!("output {name} is not defined"));
    }
    let Some(change) = index.plan().output_change(name) else {
        return Err(format!("output {name} is not planned"));
    };
    if change.after_unknown {
        return Err(format!("output {name} is known only after apply"));
    }
    change.after.as_ref().ok_or_else(|| format!("output {name} has no planned value"))
}

/// Returns true for empty arrays and objects.
fn is_empty_collection(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Returns a plural label for a declaration kind.
const fn declaration_label(kind: DeclarationKind) -> &'static str {
    match kind {
        DeclarationKind::Variable => "variables",
        DeclarationKind::Output => "outputs",
        DeclarationKind::Resource => "resources",
    }
}
