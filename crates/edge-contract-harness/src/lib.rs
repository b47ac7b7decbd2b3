// crates/edge-contract-harness/src/lib.rs
// ============================================================================
// Module: Edge Contract Harness Library
// Description: Process, cloud, and scenario plumbing around the core checks.
// Purpose: Run tofu, gcloud, and checkov safely and drive scenario suites.
// Dependencies: edge-contract-core, edge-contract-config, regex, reqwest
// ============================================================================

//! ## Overview
//! The harness owns everything with side effects: spawning external tools
//! with timeouts and redacted logging, the init/plan/apply/destroy workspace
//! lifecycle with guaranteed teardown, live-state lookups through `gcloud`,
//! HTTP probes, Checkov scans, migration artifact checks, per-run artifacts,
//! and the Gherkin scenario runner.
//!
//! Invariants:
//! - A non-zero tool exit is an error carrying the combined output.
//! - A deployment created by [`Initialized::apply`] is destroyed when dropped.
//! - Only transient tool failures are retried.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod artifacts;
pub mod checkov;
pub mod error;
pub mod events;
pub mod gcloud;
pub mod invoker;
pub mod lifecycle;
pub mod migration;
pub mod probe;
pub mod retry;
pub mod scenario;
pub mod tofu;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifacts::ReportStatus;
pub use artifacts::RunArtifacts;
pub use artifacts::TestReporter;
pub use checkov::CheckovScan;
pub use checkov::run_checkov;
pub use error::HarnessError;
pub use error::InvocationError;
pub use error::ToolFailure;
pub use events::EventOutcome;
pub use events::EventSink;
pub use events::HarnessEvent;
pub use events::MemoryEventSink;
pub use events::SharedSink;
pub use events::resolve_sink;
pub use gcloud::Gcloud;
pub use gcloud::ResourceKind;
pub use invoker::CommandOutput;
pub use invoker::CommandSpec;
pub use invoker::Invoker;
pub use invoker::PartialOutput;
pub use lifecycle::Deployment;
pub use lifecycle::ModuleCopy;
pub use lifecycle::copy_module_to_temp;
pub use lifecycle::unique_id;
pub use lifecycle::wait_until;
pub use probe::HttpProbe;
pub use probe::ProbeResponse;
pub use retry::RetryPolicy;
pub use scenario::ScenarioError;
pub use scenario::ScenarioRunner;
pub use scenario::StepError;
pub use scenario::StepRegistry;
pub use tofu::Initialized;
pub use tofu::Tofu;
pub use tofu::TofuOptions;
