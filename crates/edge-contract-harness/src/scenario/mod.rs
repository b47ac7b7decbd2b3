// crates/edge-contract-harness/src/scenario/mod.rs
// ============================================================================
// Module: Scenario Runner
// Description: Gherkin features, step registry checks, and cucumber runs.
// Purpose: Drive behaviour specs through explicitly registered steps.
// Dependencies: cucumber, regex, edge-contract-core
// ============================================================================

//! ## Overview
//! Feature files are parsed by the `gherkin` crate re-exported from
//! `cucumber`. Worlds derive `cucumber::World` and bind their steps with
//! `#[given]`, `#[when]`, and `#[then]`, so scenario state lives only in
//! the world value cucumber creates per scenario. A [`StepRegistry`] lists
//! the same patterns, and [`ScenarioRunner`] checks every selected step
//! against it before cucumber runs, then condenses cucumber's summary into
//! a [`FeatureRun`]. Step functions return [`StepError`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod features;
pub mod registry;
pub mod runner;

// ============================================================================
// SECTION: Imports
// ============================================================================

use edge_contract_core::AttributeError;
use edge_contract_core::CheckFailures;
use edge_contract_core::LookupError;
use edge_contract_core::PlanError;
use thiserror::Error;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use features::Feature;
pub use features::Rule;
pub use features::Scenario;
pub use features::Step;
pub use features::StepType;
pub use features::doc_string;
pub use features::load_feature;
pub use features::parse_feature;
pub use features::table_column;
pub use registry::Preflight;
pub use registry::StepKind;
pub use registry::StepMatch;
pub use registry::StepRegistry;
pub use runner::FeatureRun;
pub use runner::PreparedFeature;
pub use runner::RunCounts;
pub use runner::ScenarioRunner;
pub use runner::TagFilter;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Feature parsing and registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    /// Feature text is malformed.
    #[error("{origin}: {message}")]
    Parse {
        /// File path or `<input>`.
        origin: String,
        /// Parser message with line and column.
        message: String,
    },
    /// Feature file could not be read.
    #[error("cannot read feature {origin}: {message}")]
    Io {
        /// File path.
        origin: String,
        /// OS error text.
        message: String,
    },
    /// Step pattern registration or validation failed.
    #[error("step registry: {0}")]
    Registry(String),
    /// Selected steps have no unique pattern.
    #[error("feature {feature} has unresolved steps: {problems}")]
    Unresolved {
        /// Feature name.
        feature: String,
        /// Each undefined or ambiguous step with its line.
        problems: String,
    },
    /// A tag expression could not be parsed.
    #[error("invalid tag expression: {0}")]
    TagExpression(String),
    /// One or more scenarios failed.
    #[error("feature {feature} failed: {summary}")]
    Failed {
        /// Feature name.
        feature: String,
        /// Count summary.
        summary: String,
    },
}

/// Failure returned by a step handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StepError {
    /// Failure description.
    pub message: String,
}

impl StepError {
    /// Creates a step error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for StepError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for StepError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<HarnessError> for StepError {
    fn from(err: HarnessError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<PlanError> for StepError {
    fn from(err: PlanError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<AttributeError> for StepError {
    fn from(err: AttributeError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<LookupError> for StepError {
    fn from(err: LookupError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<CheckFailures> for StepError {
    fn from(err: CheckFailures) -> Self {
        Self::new(err.to_string())
    }
}
