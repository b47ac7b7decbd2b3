// system-tests/src/lib.rs
// ============================================================================
// Module: Edge Contract System Tests Library
// Description: Shared configuration for system test binaries.
// Purpose: Resolve cloud credentials and module locations once for all suites.
// Dependencies: edge-contract-config
// ============================================================================

//! ## Overview
//! This crate hosts the environment configuration shared by the
//! `system-tests/tests` binaries. The binaries themselves are gated behind the
//! `system-tests` feature because they create and destroy real cloud
//! resources.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
