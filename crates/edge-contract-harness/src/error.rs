// crates/edge-contract-harness/src/error.rs
// ============================================================================
// Module: Harness Errors
// Description: Error taxonomy for tool invocation and contract runs.
// Purpose: Separate "could not run the tool" from "tool ran and failed".
// Dependencies: edge-contract-core, edge-contract-config, thiserror
// ============================================================================

//! ## Overview
//! [`HarnessError`] is the single error type surfaced by harness operations.
//! Invocation problems (binary missing, not executable, bad working
//! directory) are kept apart from tool failures (non-zero exit with output)
//! so callers can tell an environment problem from an infrastructure one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use edge_contract_config::ConfigError;
use edge_contract_core::CheckFailures;
use edge_contract_core::PlanError;
use thiserror::Error;

use crate::invoker::PartialOutput;
use crate::scenario::ScenarioError;

// ============================================================================
// SECTION: Invocation Errors
// ============================================================================

/// The tool could not be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// Binary is not on `PATH` (or the explicit path does not exist).
    #[error("{program}: executable not found")]
    NotFound {
        /// Program name or path.
        program: String,
    },
    /// Binary exists but cannot be executed.
    #[error("{program}: permission denied")]
    PermissionDenied {
        /// Program name or path.
        program: String,
    },
    /// Requested working directory does not exist.
    #[error("working directory {} does not exist", .path.display())]
    MissingWorkingDir {
        /// Missing directory.
        path: PathBuf,
    },
    /// Any other spawn failure.
    #[error("{program}: failed to spawn: {message}")]
    Spawn {
        /// Program name or path.
        program: String,
        /// OS error text.
        message: String,
    },
}

/// The tool ran and exited non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{command} exited with {}: {output}", render_status(*.status))]
pub struct ToolFailure {
    /// Redacted command line.
    pub command: String,
    /// Exit code; `None` when terminated by a signal.
    pub status: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
}

/// Renders an exit status for messages.
fn render_status(status: Option<i32>) -> String {
    status.map_or_else(|| "signal".to_string(), |code| format!("status {code}"))
}

// ============================================================================
// SECTION: Harness Errors
// ============================================================================

/// Errors raised by harness operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Tool could not be invoked.
    #[error(transparent)]
    Invocation(#[from] InvocationError),
    /// Tool ran and failed.
    #[error(transparent)]
    ToolFailure(#[from] ToolFailure),
    /// One or more contract predicates failed.
    #[error("contract failed: {0}")]
    Assertion(#[from] CheckFailures),
    /// Required environment or credential is missing.
    #[error("precondition failed: {0}")]
    Precondition(String),
    /// Plan, output, or report document could not be decoded.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Feature file or step failure.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// A command or polling deadline elapsed.
    #[error("timed out after {}s waiting for {what}", .waited.as_secs())]
    Timeout {
        /// What was being waited on.
        what: String,
        /// Time spent waiting.
        waited: Duration,
        /// Output a killed command wrote before its deadline.
        partial: Option<PartialOutput>,
    },
}

impl HarnessError {
    /// Builds a precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Returns true when the error is a contract failure.
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion(_))
    }

    /// Returns the tool output for tool failures.
    #[must_use]
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::ToolFailure(failure) => Some(failure.output.as_str()),
            _ => None,
        }
    }
}
