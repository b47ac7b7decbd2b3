// crates/edge-contract-core/src/outputs.rs
// ============================================================================
// Module: Output Values
// Description: Decoding of `tofu output -json` documents.
// Purpose: Typed access to applied root module outputs.
// Dependencies: serde, serde_json, crate::plan
// ============================================================================

//! ## Overview
//! After apply, root outputs are read with `tofu output -json`. Each entry
//! carries its value, type, and sensitivity flag. [`Outputs::render`]
//! stringifies scalar values the same way the engine prints them on the
//! command line (`true`, `42`, plain strings), which is what contract checks
//! such as `psc_enabled == "true"` compare against.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::plan::PlanError;

// ============================================================================
// SECTION: Output Documents
// ============================================================================

/// One root module output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputValue {
    /// Output value.
    pub value: Value,
    /// Engine type descriptor.
    #[serde(rename = "type", default)]
    pub value_type: Option<Value>,
    /// Sensitive marker.
    #[serde(default)]
    pub sensitive: bool,
}

/// Decoded `tofu output -json` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outputs {
    /// Outputs keyed by name.
    values: BTreeMap<String, OutputValue>,
}

impl Outputs {
    /// Parses `tofu output -json` text.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Decode`] for malformed documents.
    pub fn from_json_str(text: &str) -> Result<Self, PlanError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PlanError::Decode("output json is empty".to_string()));
        }
        serde_json::from_str(trimmed).map_err(|err| PlanError::Decode(err.to_string()))
    }

    /// Returns an output value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).map(|output| &output.value)
    }

    /// Returns the full output entry.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&OutputValue> {
        self.values.get(name)
    }

    /// Returns output names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns true when no outputs are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Renders an output the way the CLI prints a single raw value.
    #[must_use]
    pub fn render(&self, name: &str) -> Option<String> {
        self.get(name).map(render_value)
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses `tofu output -json` text.
///
/// # Errors
///
/// Returns [`PlanError::Decode`] for malformed documents.
pub fn parse_outputs(text: &str) -> Result<Outputs, PlanError> {
    Outputs::from_json_str(text)
}

/// Renders a JSON value as CLI text.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
