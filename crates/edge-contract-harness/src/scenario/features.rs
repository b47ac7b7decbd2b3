// crates/edge-contract-harness/src/scenario/features.rs
// ============================================================================
// Module: Feature Loading
// Description: Gherkin feature parsing through the cucumber gherkin crate.
// Purpose: Load feature files and walk their scenarios, tags, and steps.
// Dependencies: cucumber (gherkin)
// ============================================================================

//! ## Overview
//! Features are parsed by the `gherkin` crate that `cucumber` re-exports,
//! so the pre-run step check and the cucumber executor see the same tree.
//! Parse and read failures map onto [`ScenarioError`]. Tags are compared
//! without their leading `@`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use cucumber::gherkin::GherkinEnv;
use cucumber::gherkin::ParseFileError;

use super::ScenarioError;
use super::StepError;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cucumber::gherkin::Feature;
pub use cucumber::gherkin::Rule;
pub use cucumber::gherkin::Scenario;
pub use cucumber::gherkin::Step;
pub use cucumber::gherkin::StepType;

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Reads and parses a feature file.
///
/// # Errors
///
/// Returns [`ScenarioError::Io`] when the file cannot be read and
/// [`ScenarioError::Parse`] when it is not valid Gherkin.
pub fn load_feature(path: &Path) -> Result<Feature, ScenarioError> {
    let origin = path.display().to_string();
    Feature::parse_path(path, GherkinEnv::default()).map_err(|err| match err {
        ParseFileError::Reading {
            source, ..
        } => ScenarioError::Io {
            origin,
            message: source.to_string(),
        },
        ParseFileError::Parsing {
            source, ..
        } => ScenarioError::Parse {
            origin,
            message: source.to_string(),
        },
    })
}

/// Parses feature text.
///
/// # Errors
///
/// Returns [`ScenarioError::Parse`] when the text is not valid Gherkin.
pub fn parse_feature(text: &str) -> Result<Feature, ScenarioError> {
    Feature::parse(text, GherkinEnv::default()).map_err(|err| ScenarioError::Parse {
        origin: "<input>".to_string(),
        message: err.to_string(),
    })
}

// ============================================================================
// SECTION: Traversal
// ============================================================================

/// Returns every scenario with its enclosing rule, top-level scenarios first.
pub fn scenarios(feature: &Feature) -> impl Iterator<Item = (Option<&Rule>, &Scenario)> {
    feature
        .scenarios
        .iter()
        .map(|scenario| (None, scenario))
        .chain(feature.rules.iter().flat_map(|rule| {
            rule.scenarios.iter().map(move |scenario| (Some(rule), scenario))
        }))
}

/// Returns the steps a scenario runs: feature background, rule background,
/// then its own steps.
pub fn steps_for<'a>(
    feature: &'a Feature,
    rule: Option<&'a Rule>,
    scenario: &'a Scenario,
) -> impl Iterator<Item = &'a Step> {
    let feature_background = feature.background.iter().flat_map(|background| background.steps.iter());
    let rule_background =
        rule.and_then(|rule| rule.background.as_ref()).into_iter().flat_map(|background| background.steps.iter());
    feature_background.chain(rule_background).chain(scenario.steps.iter())
}

/// Returns feature, rule, and scenario tags without their `@`.
#[must_use]
pub fn effective_tags(feature: &Feature, rule: Option<&Rule>, scenario: &Scenario) -> Vec<String> {
    feature
        .tags
        .iter()
        .chain(rule.into_iter().flat_map(|rule| rule.tags.iter()))
        .chain(scenario.tags.iter())
        .map(|tag| bare_tag(tag).to_string())
        .collect()
}

/// Strips a leading `@` from a tag.
#[must_use]
pub fn bare_tag(tag: &str) -> &str {
    tag.strip_prefix('@').unwrap_or(tag)
}

// ============================================================================
// SECTION: Step Arguments
// ============================================================================

/// Returns the step's doc string.
///
/// # Errors
///
/// Returns [`StepError`] when the step has no doc string.
pub fn doc_string(step: &Step) -> Result<&str, StepError> {
    step.docstring
        .as_deref()
        .ok_or_else(|| StepError::new(format!("step requires a doc string: {}", step.value)))
}

/// Returns the trimmed cells of the table column headed `header`.
///
/// # Errors
///
/// Returns [`StepError`] when the step has no table or no such column.
pub fn table_column<'a>(step: &'a Step, header: &str) -> Result<Vec<&'a str>, StepError> {
    let table = step
        .table
        .as_ref()
        .ok_or_else(|| StepError::new(format!("step requires a data table: {}", step.value)))?;
    let mut rows = table.rows.iter();
    let index = rows
        .next()
        .and_then(|headers| headers.iter().position(|cell| cell.trim() == header))
        .ok_or_else(|| StepError::new(format!("table has no '{header}' column")))?;
    Ok(rows.filter_map(|row| row.get(index)).map(|cell| cell.trim()).collect())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
