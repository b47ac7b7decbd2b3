// crates/edge-contract-core/src/toggle.rs
// ============================================================================
// Module: Toggle Superset Property
// Description: Resource-set comparison between toggle-on and toggle-off plans.
// Purpose: Verify `enable_X` variables gate exactly the resources they own.
// Dependencies: crate::index, crate::assertions
// ============================================================================

//! ## Overview
//! For a feature toggle `enable_X`, the plan with the toggle on must contain
//! every resource of the plan with the toggle off plus exactly the gated
//! resources. Keys compare by module, type, and name; `count` instances of
//! one resource collapse into a single key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Serialize;

use crate::assertions::AssertionOutcome;
use crate::index::PlanIndex;
use crate::index::ResourceKey;

// ============================================================================
// SECTION: Toggle Diff
// ============================================================================

/// Resource-set difference between two plans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToggleDiff {
    /// Keys only in the enabled plan.
    pub added: BTreeSet<ResourceKey>,
    /// Keys only in the disabled plan.
    pub removed: BTreeSet<ResourceKey>,
}

impl ToggleDiff {
    /// Computes the difference from `disabled` to `enabled`.
    #[must_use]
    pub fn between(enabled: &PlanIndex, disabled: &PlanIndex) -> Self {
        let on = enabled.resource_keys();
        let off = disabled.resource_keys();
        Self {
            added: on.difference(&off).cloned().collect(),
            removed: off.difference(&on).cloned().collect(),
        }
    }
}

// ============================================================================
// SECTION: Superset Property
// ============================================================================

/// Checks that `enabled` is a strict superset of `disabled` differing exactly
/// by `gated`.
#[must_use]
pub fn toggle_superset(
    enabled: &PlanIndex,
    disabled: &PlanIndex,
    gated: &[ResourceKey],
) -> AssertionOutcome {
    let diff = ToggleDiff::between(enabled, disabled);
    let gated: BTreeSet<ResourceKey> = gated.iter().cloned().collect();
    let mut problems = Vec::new();
    if !diff.removed.is_empty() {
        problems.push(format!("enabling removes {}", join_keys(&diff.removed)));
    }
    if diff.added.is_empty() {
        problems.push("enabled plan adds no resources".to_string());
    }
    let unexpected: BTreeSet<ResourceKey> = diff.added.difference(&gated).cloned().collect();
    if !unexpected.is_empty() {
        problems.push(format!("ungated additions {}", join_keys(&unexpected)));
    }
    let missing: BTreeSet<ResourceKey> = gated.difference(&diff.added).cloned().collect();
    if !missing.is_empty() {
        problems.push(format!("gated resources not added {}", join_keys(&missing)));
    }
    if problems.is_empty() {
        AssertionOutcome::Pass
    } else {
        AssertionOutcome::fail(problems.join("; "))
    }
}

/// Renders keys for messages.
fn join_keys(keys: &BTreeSet<ResourceKey>) -> String {
    let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
    rendered.join(", ")
}
