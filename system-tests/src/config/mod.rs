// system-tests/src/config/mod.rs
// ============================================================================
// Module: System Test Configuration
// Description: Centralized configuration for Edge Contract system tests.
// Purpose: Provide typed access to credentials, module paths, and defaults.
// Dependencies: edge-contract-config
// ============================================================================

//! ## Overview
//! System-test configuration is read from environment variables and mapped into
//! a small typed structure for reuse across test helpers.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::CloudCredentials;
pub use env::DEPLOY_ROOT;
pub use env::SystemTestConfig;
pub use env::SystemTestEnv;
