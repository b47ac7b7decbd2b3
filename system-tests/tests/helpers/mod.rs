// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for Edge Contract system-tests.
// Purpose: Provide module workspaces, fixtures, timeouts, and reporting.
// Dependencies: system-tests, edge-contract-config, edge-contract-harness
// ============================================================================

//! ## Overview
//! Shared helpers for Edge Contract system-tests.
//! Invariants:
//! - Credentials are checked before any `tofu` or `gcloud` call.
//! - Every applied deployment is released by its guard, even on panic.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod artifacts;
pub mod env;
pub mod fixtures;
pub mod timeouts;
