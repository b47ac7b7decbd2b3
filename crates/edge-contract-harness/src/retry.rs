// crates/edge-contract-harness/src/retry.rs
// ============================================================================
// Module: Retry Policy
// Description: Transient-error detection and exponential backoff.
// Purpose: Retry mutating tofu calls on known flaky provider errors only.
// Dependencies: edge-contract-config, regex
// ============================================================================

//! ## Overview
//! A [`RetryPolicy`] matches tool output against a list of transient-error
//! patterns. Matching failures are retried with exponential backoff capped at
//! a maximum delay; anything else surfaces on the first attempt. Each retry
//! emits a `retry` event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;

use edge_contract_config::RetryConfig;
use regex::Regex;

use crate::error::HarnessError;
use crate::events::EventOutcome;
use crate::events::HarnessEvent;
use crate::events::SharedSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Provider and network errors known to clear up on retry.
pub const DEFAULT_TRANSIENT_PATTERNS: [&str; 10] = [
    r"(?i)connection reset by peer",
    r"(?i)TLS handshake timeout",
    r"Client\.Timeout exceeded while awaiting headers",
    r"Failed to query available provider packages",
    r"Error installing provider",
    r"Could not download module",
    r"timeout while waiting for plugin to start",
    r"googleapi: Error 503",
    r"googleapi: Error 429",
    r"(?i)the resource '.*' is not ready",
];

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Retry settings with compiled transient-error patterns.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    max_attempts: u32,
    /// Delay before the second attempt.
    initial_backoff: Duration,
    /// Upper bound for any single delay.
    max_backoff: Duration,
    /// Transient-error patterns.
    patterns: Vec<Regex>,
}

impl RetryPolicy {
    /// Builds a policy from config, adding the default patterns.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Precondition`] when an extra pattern is not a
    /// valid regular expression.
    pub fn from_config(config: &RetryConfig) -> Result<Self, HarnessError> {
        let mut patterns = compile(DEFAULT_TRANSIENT_PATTERNS.iter().copied())?;
        patterns.extend(compile(config.extra_patterns.iter().map(String::as_str))?);
        Ok(Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            patterns,
        })
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            patterns: Vec::new(),
        }
    }

    /// Returns the attempt budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true when `output` matches a transient pattern.
    #[must_use]
    pub fn is_transient(&self, output: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(output))
    }

    /// Returns the delay before attempt `attempt + 1` (1-based `attempt`).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff.saturating_mul(1_u32 << exponent).min(self.max_backoff)
    }

    /// Runs `operation` until it succeeds, fails non-transiently, or the
    /// attempt budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the last error from `operation`.
    pub fn run<T>(
        &self,
        sink: &SharedSink,
        label: &str,
        mut operation: impl FnMut() -> Result<T, HarnessError>,
    ) -> Result<T, HarnessError> {
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let transient = err.tool_output().is_some_and(|output| self.is_transient(output));
                    if !transient || attempt >= self.max_attempts {
                        return Err(err);
                    }
                    let delay = self.backoff(attempt);
                    sink.record(
                        &HarnessEvent::new("retry", "retry", EventOutcome::Retry)
                            .with("operation", label)
                            .with("attempt", attempt)
                            .with("max_attempts", self.max_attempts)
                            .with("delay_ms", u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
                            .with("error", err.to_string()),
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

/// Compiles a list of patterns.
fn compile<'a>(patterns: impl Iterator<Item = &'a str>) -> Result<Vec<Regex>, HarnessError> {
    patterns
        .map(|pattern| {
            Regex::new(pattern).map_err(|err| {
                HarnessError::precondition(format!("invalid retry pattern {pattern}: {err}"))
            })
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
