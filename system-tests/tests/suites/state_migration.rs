// system-tests/tests/suites/state_migration.rs
// ============================================================================
// Module: State Migration Contract Tests
// Description: Checks the artifacts left behind by the directory migration.
// Purpose: Keep rollback possible and provider pins consistent.
// Dependencies: system-tests helpers, edge-contract-core, edge-contract-harness
// ============================================================================

//! Filesystem-only checks; no cloud credentials are needed.

use edge_contract_core::Checks;
use edge_contract_harness::TestReporter;
use edge_contract_harness::migration::find_backend_backups;
use edge_contract_harness::migration::find_state_backups;
use edge_contract_harness::migration::lock_files_identical;
use helpers::artifacts::finish_checks;
use helpers::artifacts::outcome;
use system_tests::config::DEPLOY_ROOT;
use system_tests::config::SystemTestConfig;

use crate::helpers;

#[test]
fn migration_left_rollback_artifacts() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("migration_left_rollback_artifacts")?;
    let config = SystemTestConfig::load()?;
    let root = config.repo_root.as_path();

    let state_backups = find_state_backups(root)?;
    let backend_backups = find_backend_backups(root)?;
    for backup in state_backups.iter().chain(&backend_backups) {
        reporter.note(format!("found {}", backup.display()));
    }

    let mut checks = Checks::new("state migration");
    checks.check(
        "state-backup-*.tfstate exists at the repository root",
        outcome(!state_backups.is_empty(), "no state backup found"),
    );
    checks.check(
        "backend.tf.backup-* exists for rollback",
        outcome(!backend_backups.is_empty(), "no backend backup found"),
    );
    checks.check(
        "backend.tf lives under the deploy root",
        outcome(
            root.join(DEPLOY_ROOT).join("backend.tf").is_file(),
            "backend.tf is missing from the deploy root",
        ),
    );
    finish_checks(&mut reporter, checks)?;
    Ok(())
}

#[test]
fn module_lock_files_pin_the_same_providers() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("module_lock_files_pin_the_same_providers")?;
    let config = SystemTestConfig::load()?;
    let locks = config.module_lock_files()?;
    let mismatched = lock_files_identical(&locks)?;

    let rendered: Vec<String> = mismatched.iter().map(|path| path.display().to_string()).collect();
    let mut checks = Checks::new("lock files");
    checks.check(
        "modules share one dependency lock file",
        outcome(mismatched.is_empty(), &format!("differs: {}", rendered.join(", "))),
    );
    finish_checks(&mut reporter, checks)?;
    Ok(())
}
