// crates/edge-contract-harness/src/scenario/runner.rs
// ============================================================================
// Module: Scenario Execution
// Description: Tag selection, pre-run step checks, and cucumber run summaries.
// Purpose: Wrap cucumber runs with registry checks and harness reporting.
// Dependencies: cucumber, edge-contract-harness events
// ============================================================================

//! ## Overview
//! [`ScenarioRunner::prepare`] parses a feature and checks its selected
//! steps against the registry. The caller then runs the feature with its
//! own cucumber world, passing [`PreparedFeature::selector`] to
//! `filter_run`, and hands the summarizing writer back to
//! [`ScenarioRunner::finish`] for a [`FeatureRun`]:
//!
//! ```text
//! let prepared = runner.prepare(&path)?;
//! let writer = block_on(
//!     PlanWorld::cucumber()
//!         .with_default_cli()
//!         .max_concurrent_scenarios(1)
//!         .fail_on_skipped()
//!         .filter_run(prepared.path().to_path_buf(), prepared.selector()),
//! );
//! runner.finish(&prepared, &writer).into_result()?;
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use cucumber::writer::Stats as _;
use cucumber::writer::Summarize;

use super::Feature;
use super::Preflight;
use super::Rule;
use super::Scenario;
use super::ScenarioError;
use super::StepRegistry;
use super::features::bare_tag;
use super::features::effective_tags;
use super::load_feature;
use crate::events::EventOutcome;
use crate::events::HarnessEvent;
use crate::events::NoopEventSink;
use crate::events::SharedSink;

// ============================================================================
// SECTION: Run Summary
// ============================================================================

/// Passed, failed, and skipped counts for scenarios or steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCounts {
    /// Passed.
    pub passed: usize,
    /// Failed.
    pub failed: usize,
    /// Skipped.
    pub skipped: usize,
}

impl RunCounts {
    /// Returns the total count.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Result of running one feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRun {
    /// Feature name.
    pub feature: String,
    /// Scenario counts.
    pub scenarios: RunCounts,
    /// Step counts, background steps included.
    pub steps: RunCounts,
    /// Feature files cucumber failed to parse.
    pub parsing_errors: usize,
    /// Failed `before` or `after` hooks.
    pub hook_errors: usize,
    /// Scenarios excluded by the tag filter.
    pub filtered_out: usize,
}

impl FeatureRun {
    /// Returns true when every scenario that ran passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.scenarios.failed == 0
            && self.scenarios.skipped == 0
            && self.steps.failed == 0
            && self.parsing_errors == 0
            && self.hook_errors == 0
    }

    /// Returns a one-line count summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut scenarios = vec![
            format!("{} passed", self.scenarios.passed),
            format!("{} failed", self.scenarios.failed),
        ];
        if self.scenarios.skipped > 0 {
            scenarios.push(format!("{} skipped", self.scenarios.skipped));
        }
        let mut steps = vec![format!("{} passed", self.steps.passed)];
        for (count, label) in [(self.steps.failed, "failed"), (self.steps.skipped, "skipped")] {
            if count > 0 {
                steps.push(format!("{count} {label}"));
            }
        }
        let mut line = format!(
            "{} scenarios ({}), {} steps ({})",
            self.scenarios.total(),
            scenarios.join(", "),
            self.steps.total(),
            steps.join(", ")
        );
        for (count, label) in [(self.parsing_errors, "parsing errors"), (self.hook_errors, "hook errors")] {
            if count > 0 {
                line.push_str(&format!(", {count} {label}"));
            }
        }
        line
    }

    /// Returns 0 when every scenario passed and 1 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.passed() { 0 } else { 1 }
    }

    /// Converts a failing run into [`ScenarioError::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Failed`] when any scenario failed.
    pub fn into_result(self) -> Result<Self, ScenarioError> {
        if self.passed() {
            Ok(self)
        } else {
            Err(ScenarioError::Failed {
                summary: self.summary(),
                feature: self.feature,
            })
        }
    }
}

// ============================================================================
// SECTION: Tag Filter
// ============================================================================

/// Conjunction of required and excluded tags.
///
/// `@a @b` requires both tags; `~@a` or `not @a` excludes a tag. The word
/// `and` between terms is accepted and ignored. An empty expression
/// matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagFilter {
    /// Tags that must be present, without `@`.
    required: Vec<String>,
    /// Tags that must be absent, without `@`.
    excluded: Vec<String>,
}

impl TagFilter {
    /// Parses a tag expression.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::TagExpression`] for malformed expressions.
    pub fn parse(expression: &str) -> Result<Self, ScenarioError> {
        let mut filter = Self::default();
        let mut negate = false;
        for token in expression.split_whitespace() {
            match token {
                "and" => {}
                "not" => {
                    if negate {
                        return Err(ScenarioError::TagExpression(expression.to_string()));
                    }
                    negate = true;
                }
                _ => {
                    let (excluded, tag) = match token.strip_prefix('~') {
                        Some(tag) => (true, tag),
                        None => (negate, token),
                    };
                    let Some(name) = tag.strip_prefix('@').filter(|name| !name.is_empty()) else {
                        return Err(ScenarioError::TagExpression(expression.to_string()));
                    };
                    if excluded {
                        filter.excluded.push(name.to_string());
                    } else {
                        filter.required.push(name.to_string());
                    }
                    negate = false;
                }
            }
        }
        if negate {
            return Err(ScenarioError::TagExpression(expression.to_string()));
        }
        Ok(filter)
    }

    /// Returns true when `tags` satisfy the filter; a leading `@` is optional.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        let has = |wanted: &String| tags.iter().any(|tag| bare_tag(tag.as_ref()) == wanted);
        self.required.iter().all(has) && !self.excluded.iter().any(has)
    }

    /// Returns true when the scenario's effective tags satisfy the filter.
    #[must_use]
    pub fn selects(&self, feature: &Feature, rule: Option<&Rule>, scenario: &Scenario) -> bool {
        self.matches(&effective_tags(feature, rule, scenario))
    }
}

// ============================================================================
// SECTION: Prepared Feature
// ============================================================================

/// A parsed feature whose selected steps all resolve.
#[derive(Debug, Clone)]
pub struct PreparedFeature {
    /// Feature file.
    path: PathBuf,
    /// Parsed feature.
    feature: Feature,
    /// Scenario selection.
    filter: TagFilter,
    /// Registry check outcome.
    preflight: Preflight,
}

impl PreparedFeature {
    /// Returns the feature file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the parsed feature.
    #[must_use]
    pub const fn feature(&self) -> &Feature {
        &self.feature
    }

    /// Returns the registry check outcome.
    #[must_use]
    pub const fn preflight(&self) -> Preflight {
        self.preflight
    }

    /// Returns a scenario filter for cucumber's `filter_run`.
    #[must_use]
    pub fn selector(&self) -> impl Fn(&Feature, Option<&Rule>, &Scenario) -> bool + 'static {
        let filter = self.filter.clone();
        move |feature, rule, scenario| filter.selects(feature, rule, scenario)
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Checks features against a registry and summarizes cucumber runs.
pub struct ScenarioRunner {
    /// Step patterns.
    registry: StepRegistry,
    /// Scenario selection.
    filter: TagFilter,
    /// Event sink.
    sink: SharedSink,
}

impl ScenarioRunner {
    /// Creates a runner after validating the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Registry`] when registry examples conflict.
    pub fn new(registry: StepRegistry) -> Result<Self, ScenarioError> {
        registry.validate()?;
        Ok(Self {
            registry,
            filter: TagFilter::default(),
            sink: Arc::new(NoopEventSink),
        })
    }

    /// Sets the tag filter.
    #[must_use]
    pub fn with_filter(mut self, filter: TagFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the tag filter.
    #[must_use]
    pub const fn filter(&self) -> &TagFilter {
        &self.filter
    }

    /// Loads `path` and checks every selected step against the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] when the file cannot be read or parsed, or
    /// when a selected step is undefined or ambiguous.
    pub fn prepare(&self, path: &Path) -> Result<PreparedFeature, ScenarioError> {
        let feature = load_feature(path)?;
        let checked = self.registry.check(&feature, &self.filter);
        let outcome = if checked.is_ok() { EventOutcome::Ok } else { EventOutcome::Failed };
        self.sink.record(
            &HarnessEvent::new("feature_checked", "scenario", outcome)
                .with("feature", feature.name.as_str())
                .with("path", path.display().to_string()),
        );
        Ok(PreparedFeature {
            path: path.to_path_buf(),
            feature,
            filter: self.filter.clone(),
            preflight: checked?,
        })
    }

    /// Builds the run summary from cucumber's summarizing writer.
    #[must_use]
    pub fn finish<W, Wr>(&self, prepared: &PreparedFeature, writer: &Summarize<Wr>) -> FeatureRun
    where
        W: cucumber::World,
        Summarize<Wr>: cucumber::writer::Stats<W>,
    {
        let scenarios = writer.scenarios_stats();
        let steps = writer.steps_stats();
        let run = FeatureRun {
            feature: prepared.feature.name.clone(),
            scenarios: RunCounts {
                passed: scenarios.passed,
                failed: scenarios.failed,
                skipped: scenarios.skipped,
            },
            steps: RunCounts {
                passed: steps.passed,
                failed: steps.failed,
                skipped: steps.skipped,
            },
            parsing_errors: writer.parsing_errors(),
            hook_errors: writer.hook_errors(),
            filtered_out: prepared.preflight.filtered_out,
        };
        self.record(&run);
        run
    }

    /// Emits the `feature_run` event.
    fn record(&self, run: &FeatureRun) {
        self.sink.record(
            &HarnessEvent::new(
                "feature_run",
                "scenario",
                if run.passed() { EventOutcome::Ok } else { EventOutcome::Failed },
            )
            .with("feature", run.feature.as_str())
            .with("scenarios_passed", run.scenarios.passed)
            .with("scenarios_failed", run.scenarios.failed)
            .with("filtered_out", run.filtered_out),
        );
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
