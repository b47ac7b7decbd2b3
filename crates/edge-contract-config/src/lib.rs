// crates/edge-contract-config/src/lib.rs
// ============================================================================
// Module: Edge Contract Config Library
// Description: Canonical harness config model and environment overrides.
// Purpose: Single source of truth for edge-contract.toml semantics.
// Dependencies: edge-contract-core, serde, toml
// ============================================================================

//! ## Overview
//! `edge-contract-config` defines the harness configuration: the `tofu`
//! binary and flags, retry policy, the infrastructure modules under test with
//! their input variables, Checkov settings, and the structured event sink.
//! Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::CONFIG_ENV_VAR;
pub use config::CheckovConfig;
pub use config::ConfigError;
pub use config::EdgeContractConfig;
pub use config::LogSinkKind;
pub use config::LoggingConfig;
pub use config::ModuleConfig;
pub use config::RetryConfig;
pub use config::TofuConfig;
pub use env::HarnessEnv;
pub use env::HarnessEnvConfig;
pub use env::LogTarget;
pub use env::read_env_nonempty;
pub use env::read_env_strict;
