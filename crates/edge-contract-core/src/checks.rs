// crates/edge-contract-core/src/checks.rs
// ============================================================================
// Module: Check Accumulator
// Description: Require-versus-check failure semantics for contract runs.
// Purpose: Abort on broken preconditions, report independent failures together.
// Dependencies: crate::assertions, serde, thiserror
// ============================================================================

//! ## Overview
//! [`Checks`] collects assertion outcomes for one subject (a module plan, a
//! live deployment). [`Checks::require`] aborts immediately with every
//! failure recorded so far; [`Checks::check`] records and continues.
//! [`Checks::finish`] returns all failures together as one
//! [`CheckFailures`] error, or a [`CheckSummary`] when nothing failed.
//! Unknown outcomes are not failures; the summary counts them separately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::assertions::AssertionOutcome;
use crate::assertions::ContractAssertion;
use crate::index::PlanIndex;
use crate::outputs::Outputs;

// ============================================================================
// SECTION: Records
// ============================================================================

/// One recorded check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRecord {
    /// Human-readable label.
    pub label: String,
    /// Outcome.
    pub outcome: AssertionOutcome,
}

/// Summary of a fully passing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    /// Subject under test.
    pub subject: String,
    /// Number of passing checks.
    pub passed: usize,
    /// Number of checks the plan could not decide.
    pub unknown: usize,
}

/// One or more contract failures for a subject.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{subject}: {} of {total} checks failed: {}", .failures.len(), render_failures(.failures))]
pub struct CheckFailures {
    /// Subject under test.
    pub subject: String,
    /// Total checks evaluated before reporting.
    pub total: usize,
    /// Failing records.
    pub failures: Vec<CheckRecord>,
}

/// Renders failing records as `label (message)` pairs.
fn render_failures(failures: &[CheckRecord]) -> String {
    let rendered: Vec<String> = failures
        .iter()
        .map(|record| match record.outcome.message() {
            Some(message) => format!("[{}] {message}", record.label),
            None => format!("[{}]", record.label),
        })
        .collect();
    rendered.join("; ")
}

// ============================================================================
// SECTION: Accumulator
// ============================================================================

/// Accumulates outcomes for one subject.
#[derive(Debug, Clone)]
pub struct Checks {
    /// Subject under test.
    subject: String,
    /// Recorded outcomes in evaluation order.
    records: Vec<CheckRecord>,
}

impl Checks {
    /// Starts an accumulator for `subject`.
    #[must_use]
    pub fn new(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            records: Vec::new(),
        }
    }

    /// Records an independent property check and continues.
    ///
    /// Returns whether the check did not fail.
    pub fn check(&mut self, label: impl Into<String>, outcome: AssertionOutcome) -> bool {
        let passed = !outcome.is_failure();
        self.records.push(CheckRecord {
            label: label.into(),
            outcome,
        });
        passed
    }

    /// Records a precondition and aborts on failure.
    ///
    /// # Errors
    ///
    /// Returns [`CheckFailures`] holding every failure recorded so far when
    /// this check fails.
    pub fn require(
        &mut self,
        label: impl Into<String>,
        outcome: AssertionOutcome,
    ) -> Result<(), CheckFailures> {
        if self.check(label, outcome) { Ok(()) } else { Err(self.failures()) }
    }

    /// Evaluates and records a contract assertion.
    pub fn assert(
        &mut self,
        index: &PlanIndex,
        outputs: Option<&Outputs>,
        assertion: &ContractAssertion,
    ) -> bool {
        self.check(assertion.describe(), assertion.evaluate(index, outputs))
    }

    /// Evaluates a contract assertion as a precondition.
    ///
    /// # Errors
    ///
    /// Returns [`CheckFailures`] when the assertion fails.
    pub fn require_assertion(
        &mut self,
        index: &PlanIndex,
        outputs: Option<&Outputs>,
        assertion: &ContractAssertion,
    ) -> Result<(), CheckFailures> {
        self.require(assertion.describe(), assertion.evaluate(index, outputs))
    }

    /// Returns the subject label.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns every recorded outcome.
    #[must_use]
    pub fn records(&self) -> &[CheckRecord] {
        &self.records
    }

    /// Returns true when no recorded check failed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.records.iter().any(|record| record.outcome.is_failure())
    }

    /// Finishes the run.
    ///
    /// # Errors
    ///
    /// Returns [`CheckFailures`] listing every failed check.
    pub fn finish(self) -> Result<CheckSummary, CheckFailures> {
        if self.all_passed() {
            let passed = self.records.iter().filter(|record| record.outcome.is_pass()).count();
            Ok(CheckSummary {
                unknown: self.records.len().saturating_sub(passed),
                passed,
                subject: self.subject,
            })
        } else {
            Err(self.failures())
        }
    }

    /// Collects the failing records.
    fn failures(&self) -> CheckFailures {
        CheckFailures {
            subject: self.subject.clone(),
            total: self.records.len(),
            failures: self
                .records
                .iter()
                .filter(|record| record.outcome.is_failure())
                .cloned()
                .collect(),
        }
    }
}
