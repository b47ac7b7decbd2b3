// crates/edge-contract-harness/src/migration.rs
// ============================================================================
// Module: State Migration Artifacts
// Description: Checks for state backups, backend backups, and lock files.
// Purpose: Confirm a directory migration left rollback artifacts behind.
// Dependencies: serde_json, sha2
// ============================================================================

//! ## Overview
//! A state migration leaves `state-backup-*.tfstate` and
//! `backend.tf.backup-*` files at the repository root, and every module keeps
//! a `.terraform.lock.hcl`. These helpers find the backups, validate that
//! state backups are JSON with a `version` field, and compare lock files by
//! SHA-256 digest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use edge_contract_core::PlanError;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// State backup file prefix.
const STATE_BACKUP_PREFIX: &str = "state-backup-";

/// State backup file suffix.
const STATE_BACKUP_SUFFIX: &str = ".tfstate";

/// Backend backup file prefix.
const BACKEND_BACKUP_PREFIX: &str = "backend.tf.backup-";

/// Dependency lock file name.
pub const LOCK_FILE_NAME: &str = ".terraform.lock.hcl";

// ============================================================================
// SECTION: Backups
// ============================================================================

/// Returns `state-backup-*.tfstate` files directly under `root`, sorted.
///
/// # Errors
///
/// Returns an error when `root` cannot be read, or when a backup is not JSON
/// with a `version` field.
pub fn find_state_backups(root: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let backups = matching_files(root, |name| {
        name.starts_with(STATE_BACKUP_PREFIX)
            && name.ends_with(STATE_BACKUP_SUFFIX)
            && name.len() > STATE_BACKUP_PREFIX.len() + STATE_BACKUP_SUFFIX.len()
    })?;
    for path in &backups {
        validate_state_backup(path)?;
    }
    Ok(backups)
}

/// Returns `backend.tf.backup-*` files directly under `root`, sorted.
///
/// # Errors
///
/// Returns an error when `root` cannot be read.
pub fn find_backend_backups(root: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    matching_files(root, |name| {
        name.starts_with(BACKEND_BACKUP_PREFIX) && name.len() > BACKEND_BACKUP_PREFIX.len()
    })
}

/// Checks that a state backup is a JSON object with a `version` field.
fn validate_state_backup(path: &Path) -> Result<(), HarnessError> {
    let text = fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&text).map_err(|err| {
        PlanError::Decode(format!("state backup {} is not valid JSON: {err}", path.display()))
    })?;
    if document.get("version").is_none() {
        return Err(PlanError::Decode(format!(
            "state backup {} has no version field",
            path.display()
        ))
        .into());
    }
    Ok(())
}

/// Lists regular files under `root` whose names satisfy `accept`.
fn matching_files(
    root: &Path,
    accept: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, HarnessError> {
    let mut found = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(&accept) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

// ============================================================================
// SECTION: Lock Files
// ============================================================================

/// Returns the hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns an error when the file cannot be read.
pub fn file_digest(path: &Path) -> Result<String, HarnessError> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}

/// Compares lock files against the first one.
///
/// Returns the paths whose digest differs from the first path's digest;
/// an empty result means every copy is identical.
///
/// # Errors
///
/// Returns an error when a lock file cannot be read.
pub fn lock_files_identical(paths: &[PathBuf]) -> Result<Vec<PathBuf>, HarnessError> {
    let Some((first, rest)) = paths.split_first() else {
        return Ok(Vec::new());
    };
    let reference = file_digest(first)?;
    let mut mismatched = Vec::new();
    for path in rest {
        if file_digest(path)? != reference {
            mismatched.push(path.clone());
        }
    }
    Ok(mismatched)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
