// crates/edge-contract-core/src/lib.rs
// ============================================================================
// Module: Edge Contract Core Library
// Description: Plan model, plan indexing, and contract assertion evaluation.
// Purpose: Pure, process-free verification logic for OpenTofu plan contracts.
// Dependencies: serde, serde_json, jsonpath_lib, thiserror
// ============================================================================

//! ## Overview
//! `edge-contract-core` turns the JSON rendering of an OpenTofu plan into an
//! indexed, read-only model and evaluates contract assertions against it.
//! Nothing in this crate spawns processes or touches the network; the harness
//! crate feeds it plan JSON, output JSON, and live-state documents.
//!
//! Invariants:
//! - Plan decoding fails closed on malformed input or unsupported schema.
//! - Resource keys always carry the full module path.
//! - Missing attributes never compare as matches.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod assertions;
pub mod attributes;
pub mod checks;
pub mod comparator;
pub mod index;
pub mod outputs;
pub mod plan;
pub mod security;
pub mod threats;
pub mod toggle;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assertions::AssertionOutcome;
pub use assertions::ContractAssertion;
pub use assertions::ContractSuite;
pub use assertions::DeclarationKind;
pub use assertions::ResourceSelector;
pub use attributes::AttributeError;
pub use attributes::AttributePath;
pub use attributes::ShapeMismatch;
pub use attributes::Attributes;
pub use checks::CheckFailures;
pub use checks::CheckRecord;
pub use checks::CheckSummary;
pub use checks::Checks;
pub use comparator::Comparator;
pub use comparator::TriState;
pub use comparator::evaluate_comparator;
pub use index::LookupError;
pub use index::PlanIndex;
pub use index::ResourceKey;
pub use outputs::OutputValue;
pub use outputs::Outputs;
pub use outputs::parse_outputs;
pub use plan::Action;
pub use plan::ExecutionPlan;
pub use plan::InstanceKey;
pub use plan::PlanError;
pub use plan::ResourceAddress;
pub use plan::ResourceChange;
pub use plan::ResourceMode;
pub use security::ExposureScan;
pub use security::FirewallRule;
pub use security::PUBLIC_SOURCE_RANGES;
pub use security::public_exposure_violations;
pub use security::scan_exposure;
pub use threats::Severity;
pub use threats::SeverityCounts;
pub use threats::Threat;
pub use threats::ThreatReport;
pub use toggle::ToggleDiff;
pub use toggle::toggle_superset;
