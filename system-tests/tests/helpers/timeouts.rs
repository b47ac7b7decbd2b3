// system-tests/tests/helpers/timeouts.rs
// ============================================================================
// Module: System Test Timeouts
// Description: Centralized polling deadlines with env overrides.
// Purpose: Keep propagation waits consistent and configurable across suites.
// ============================================================================

use std::time::Duration;

use edge_contract_config::HarnessEnvConfig;

/// Load balancer and certificate propagation deadline.
pub const PROPAGATION_DEADLINE: Duration = Duration::from_secs(600);

/// Interval between propagation probes.
pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Probe attempts for the HTTP checks.
pub const PROBE_ATTEMPTS: u32 = 40;

/// Returns the effective deadline, honoring `EDGE_CONTRACT_TIMEOUT_SEC` when set.
/// The override acts as a minimum to avoid shortening explicitly longer waits.
#[must_use]
pub fn resolve_timeout(requested: Duration, env: &HarnessEnvConfig) -> Duration {
    env.timeout.map_or(requested, |override_timeout| requested.max(override_timeout))
}
