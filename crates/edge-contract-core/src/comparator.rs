// crates/edge-contract-core/src/comparator.rs
// ============================================================================
// Module: Attribute Comparators
// Description: Comparator evaluation over JSON attribute values.
// Purpose: Convert attribute values into tri-state comparison outcomes.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Comparators decide whether an observed attribute value satisfies an
//! expectation. Missing values and type combinations that cannot be compared
//! yield [`TriState::Unknown`], which assertions treat as a failure so that a
//! contract never passes on absent data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Comparison applied to an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// JSON equality.
    Equals,
    /// JSON inequality.
    NotEquals,
    /// Value is one of the expected array's members.
    InSet,
    /// String contains substring, or array contains element(s).
    Contains,
    /// Negation of [`Comparator::Contains`].
    NotContains,
    /// Value is present and not null.
    Exists,
    /// Value is absent or null.
    NotExists,
    /// String, array, or object with at least one element.
    NonEmpty,
}

impl Comparator {
    /// Returns the comparator label used in failure messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::InSet => "in_set",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::Exists => "exists",
            Self::NotExists => "not_exists",
            Self::NonEmpty => "non_empty",
        }
    }
}

/// Three-valued comparison outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriState {
    /// The comparison holds.
    True,
    /// The comparison does not hold.
    False,
    /// The comparison cannot be decided from the inputs.
    Unknown,
}

impl TriState {
    /// Returns true only for [`TriState::True`].
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    /// Logical negation preserving `Unknown`.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates a comparator against an observed value.
///
/// `actual` is `None` when the attribute is absent.
#[must_use]
pub fn evaluate_comparator(
    comparator: Comparator,
    expected: Option<&Value>,
    actual: Option<&Value>,
) -> TriState {
    let present = actual.filter(|value| !value.is_null());
    match comparator {
        Comparator::Exists => TriState::from(present.is_some()),
        Comparator::NotExists => TriState::from(present.is_none()),
        Comparator::NonEmpty => present.map_or(TriState::False, is_non_empty),
        _ => {
            let (Some(actual), Some(expected)) = (actual, expected) else {
                return TriState::Unknown;
            };
            evaluate_value_comparator(comparator, expected, actual)
        }
    }
}

/// Evaluates comparators that need both an expected and an actual value.
fn evaluate_value_comparator(comparator: Comparator, expected: &Value, actual: &Value) -> TriState {
    match comparator {
        Comparator::Equals => TriState::from(actual == expected),
        Comparator::NotEquals => TriState::from(actual != expected),
        Comparator::InSet => compare_in_set(actual, expected),
        Comparator::Contains => compare_contains(actual, expected),
        Comparator::NotContains => compare_contains(actual, expected).negate(),
        Comparator::Exists | Comparator::NotExists | Comparator::NonEmpty => TriState::Unknown,
    }
}

/// Evaluates containment for strings and arrays.
fn compare_contains(haystack: &Value, needle: &Value) -> TriState {
    match (haystack, needle) {
        (Value::String(haystack), Value::String(needle)) => {
            TriState::from(haystack.contains(needle.as_str()))
        }
        (Value::Array(haystack), Value::Array(needle)) => {
            TriState::from(needle.iter().all(|item| haystack.contains(item)))
        }
        (Value::Array(haystack), scalar) => TriState::from(haystack.contains(scalar)),
        _ => TriState::Unknown,
    }
}

/// Evaluates set membership for JSON values.
fn compare_in_set(value: &Value, expected: &Value) -> TriState {
    match expected {
        Value::Array(values) => TriState::from(values.contains(value)),
        _ => TriState::Unknown,
    }
}

/// Evaluates non-emptiness for collections and strings.
fn is_non_empty(value: &Value) -> TriState {
    match value {
        Value::String(text) => TriState::from(!text.trim().is_empty()),
        Value::Array(items) => TriState::from(!items.is_empty()),
        Value::Object(map) => TriState::from(!map.is_empty()),
        Value::Null => TriState::False,
        Value::Bool(_) | Value::Number(_) => TriState::Unknown,
    }
}
