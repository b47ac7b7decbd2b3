// crates/edge-contract-harness/src/scenario/registry.rs
// ============================================================================
// Module: Step Registry
// Description: Anchored regex step patterns checked against parsed features.
// Purpose: Flag undefined and ambiguous steps before cucumber runs them.
// Dependencies: regex, cucumber (gherkin)
// ============================================================================

//! ## Overview
//! A registry lists the patterns a world's `#[given]`, `#[when]`, and
//! `#[then]` steps use, keyed by step kind. Every pattern is anchored to
//! the whole step text. [`StepRegistry::validate`] checks that each example
//! sentence matches its own pattern and no other, and
//! [`StepRegistry::check`] walks a parsed feature so undefined or ambiguous
//! steps fail with their line numbers instead of surfacing mid-run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use regex::Regex;

use super::Feature;
use super::ScenarioError;
use super::Step;
use super::StepType;
use super::TagFilter;
use super::features::scenarios;
use super::features::steps_for;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Step kind a pattern is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// `Given` steps.
    Given,
    /// `When` steps.
    When,
    /// `Then` steps.
    Then,
}

impl StepKind {
    /// Returns the kind of a parsed step; `And` and `But` inherit theirs.
    #[must_use]
    pub const fn of(step: &Step) -> Self {
        match step.ty {
            StepType::Given => Self::Given,
            StepType::When => Self::When,
            StepType::Then => Self::Then,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
        })
    }
}

/// Result of resolving step text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepMatch {
    /// Exactly one pattern matched.
    Matched {
        /// Pattern as registered.
        pattern: String,
        /// Capture groups; unmatched optional groups are empty.
        captures: Vec<String>,
    },
    /// No pattern matched.
    Undefined,
    /// More than one pattern matched; the patterns are listed.
    Ambiguous(Vec<String>),
}

/// Outcome of a pre-run check over one feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preflight {
    /// Scenarios the tag filter selects.
    pub selected: usize,
    /// Scenarios the tag filter excludes.
    pub filtered_out: usize,
    /// Steps checked across the selected scenarios.
    pub steps: usize,
}

/// One registered step.
struct StepDefinition {
    /// Step kind.
    kind: StepKind,
    /// Anchored pattern.
    regex: Regex,
    /// Pattern as registered.
    pattern: String,
    /// Example sentences that must resolve to this step.
    examples: Vec<String>,
}

/// Ordered collection of step patterns.
#[derive(Default)]
pub struct StepRegistry {
    /// Definitions in registration order.
    steps: Vec<StepDefinition>,
}

// ============================================================================
// SECTION: Registration
// ============================================================================

impl StepRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            steps: Vec::new(),
        }
    }

    /// Registers `pattern` under `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Registry`] for invalid or duplicate patterns.
    pub fn register(&mut self, kind: StepKind, pattern: &str) -> Result<(), ScenarioError> {
        self.register_with_examples(kind, pattern, &[])
    }

    /// Registers `pattern` with example sentences checked by [`Self::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Registry`] for invalid or duplicate patterns.
    pub fn register_with_examples(
        &mut self,
        kind: StepKind,
        pattern: &str,
        examples: &[&str],
    ) -> Result<(), ScenarioError> {
        if self.steps.iter().any(|step| step.kind == kind && step.pattern == pattern) {
            return Err(ScenarioError::Registry(format!("duplicate {kind} step pattern: {pattern}")));
        }
        let regex = Regex::new(&anchor(pattern)).map_err(|err| {
            ScenarioError::Registry(format!("invalid step pattern {pattern}: {err}"))
        })?;
        self.steps.push(StepDefinition {
            kind,
            regex,
            pattern: pattern.to_string(),
            examples: examples.iter().map(|example| (*example).to_string()).collect(),
        });
        Ok(())
    }

    /// Checks that every example resolves to exactly its own pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Registry`] listing every offending example.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let mut problems = Vec::new();
        for step in &self.steps {
            for example in &step.examples {
                let matching = self.matching_patterns(step.kind, example);
                if matching != [step.pattern.as_str()] {
                    problems.push(format!(
                        "example '{example}' for '{}' matches [{}]",
                        step.pattern,
                        matching.join(", ")
                    ));
                }
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ScenarioError::Registry(problems.join("; ")))
        }
    }

    /// Returns the number of registered steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true when no steps are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the registered patterns in order.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.pattern.as_str()).collect()
    }

    // ========================================================================
    // SECTION: Resolution
    // ========================================================================

    /// Resolves step text of the given kind.
    #[must_use]
    pub fn resolve(&self, kind: StepKind, text: &str) -> StepMatch {
        let mut found = self.steps.iter().filter(|step| step.kind == kind && step.regex.is_match(text));
        let Some(first) = found.next() else {
            return StepMatch::Undefined;
        };
        let others: Vec<String> = found.map(|step| step.pattern.clone()).collect();
        if !others.is_empty() {
            let mut patterns = vec![first.pattern.clone()];
            patterns.extend(others);
            return StepMatch::Ambiguous(patterns);
        }
        let captures = first
            .regex
            .captures(text)
            .map(|groups| {
                groups
                    .iter()
                    .skip(1)
                    .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect()
            })
            .unwrap_or_default();
        StepMatch::Matched {
            pattern: first.pattern.clone(),
            captures,
        }
    }

    /// Resolves every step of the scenarios `filter` selects.
    ///
    /// Outline steps that still carry `<placeholder>` text are left to the
    /// executor, which expands them from the examples table.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Unresolved`] listing each undefined or
    /// ambiguous step with its line.
    pub fn check(&self, feature: &Feature, filter: &TagFilter) -> Result<Preflight, ScenarioError> {
        let mut preflight = Preflight {
            selected: 0,
            filtered_out: 0,
            steps: 0,
        };
        let mut problems = Vec::new();
        for (rule, scenario) in scenarios(feature) {
            if !filter.selects(feature, rule, scenario) {
                preflight.filtered_out += 1;
                continue;
            }
            preflight.selected += 1;
            let outline = !scenario.examples.is_empty();
            for step in steps_for(feature, rule, scenario) {
                if outline && step.value.contains('<') {
                    continue;
                }
                preflight.steps += 1;
                let kind = StepKind::of(step);
                match self.resolve(kind, &step.value) {
                    StepMatch::Matched {
                        ..
                    } => {}
                    StepMatch::Undefined => problems.push(format!(
                        "line {}: undefined step '{kind} {}'",
                        step.position.line, step.value
                    )),
                    StepMatch::Ambiguous(patterns) => problems.push(format!(
                        "line {}: ambiguous step '{kind} {}' matches [{}]",
                        step.position.line,
                        step.value,
                        patterns.join(", ")
                    )),
                }
            }
        }
        problems.dedup();
        if problems.is_empty() {
            Ok(preflight)
        } else {
            Err(ScenarioError::Unresolved {
                feature: feature.name.clone(),
                problems: problems.join("; "),
            })
        }
    }

    /// Returns the patterns of `kind` matching `text`.
    fn matching_patterns(&self, kind: StepKind, text: &str) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|step| step.kind == kind && step.regex.is_match(text))
            .map(|step| step.pattern.as_str())
            .collect()
    }
}

/// Anchors a pattern to the whole step text.
fn anchor(pattern: &str) -> String {
    let start = if pattern.starts_with('^') { "" } else { "^" };
    let end = if pattern.ends_with('$') { "" } else { "$" };
    format!("{start}(?:{}){end}", pattern.trim_start_matches('^').trim_end_matches('$'))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
