// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed credentials and paths for system tests.
// Purpose: Fail before any cloud call when a credential is missing.
// Dependencies: edge-contract-config, edge-contract-harness
// ============================================================================

//! ## Overview
//! Values are read through the strict UTF-8 reader from `edge-contract-config`.
//! Empty values are rejected rather than treated as unset, so a blank CI
//! secret surfaces as a configuration error instead of an opaque provider
//! failure halfway through an apply.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use edge_contract_config::read_env_nonempty;
use edge_contract_harness::gcloud::PROJECT_ENV_VARS;
use edge_contract_harness::migration::LOCK_FILE_NAME;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Directory holding the OpenTofu modules, relative to the repository root.
pub const DEPLOY_ROOT: &str = "deploy/opentofu/gcp";

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Optional repository root override.
    RepoRoot,
    /// Cloudflare API token passed to the core module.
    CloudflareApiToken,
    /// Cloudflare zone id passed to the core module.
    CloudflareZoneId,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RepoRoot => "EDGE_CONTRACT_REPO_ROOT",
            Self::CloudflareApiToken => "CLOUDFLARE_API_TOKEN",
            Self::CloudflareZoneId => "CLOUDFLARE_ZONE_ID",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Credentials every module plan needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudCredentials {
    /// GCP project hosting the core infrastructure.
    pub project_id: String,
    /// Cloudflare API token.
    pub cloudflare_api_token: String,
    /// Cloudflare zone id.
    pub cloudflare_zone_id: String,
}

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTestConfig {
    /// Repository root holding `deploy/opentofu/gcp`.
    pub repo_root: PathBuf,
    /// GCP project id, from the first set project variable.
    pub project_id: Option<String>,
    /// Cloudflare API token.
    pub cloudflare_api_token: Option<String>,
    /// Cloudflare zone id.
    pub cloudflare_zone_id: Option<String>,
}

impl SystemTestConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a value is not valid UTF-8 or is set but empty.
    pub fn load() -> Result<Self, String> {
        Self::from_lookup(read_env_nonempty)
    }

    /// Loads configuration through `lookup`, which returns `Ok(None)` for
    /// unset variables.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by `lookup`.
    pub fn from_lookup(
        mut lookup: impl FnMut(&str) -> Result<Option<String>, String>,
    ) -> Result<Self, String> {
        let repo_root = lookup(SystemTestEnv::RepoRoot.as_str())?
            .map_or_else(default_repo_root, |value| PathBuf::from(value.trim()));
        let mut project_id = None;
        for name in PROJECT_ENV_VARS {
            if let Some(value) = lookup(name)? {
                project_id = Some(value.trim().to_string());
                break;
            }
        }
        let cloudflare_api_token = lookup(SystemTestEnv::CloudflareApiToken.as_str())?;
        let cloudflare_zone_id = lookup(SystemTestEnv::CloudflareZoneId.as_str())?;
        Ok(Self {
            repo_root,
            project_id,
            cloudflare_api_token,
            cloudflare_zone_id,
        })
    }

    /// Returns the directory of a module under [`DEPLOY_ROOT`].
    #[must_use]
    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.repo_root.join(DEPLOY_ROOT).join(module)
    }

    /// Returns the lock files of every module directly under [`DEPLOY_ROOT`],
    /// sorted by path.
    ///
    /// # Errors
    ///
    /// Returns an error when the deploy root cannot be read.
    pub fn module_lock_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut locks = Vec::new();
        for entry in fs::read_dir(self.repo_root.join(DEPLOY_ROOT))? {
            let lock = entry?.path().join(LOCK_FILE_NAME);
            if lock.is_file() {
                locks.push(lock);
            }
        }
        locks.sort();
        Ok(locks)
    }

    /// Returns the credentials, naming every missing variable.
    ///
    /// # Errors
    ///
    /// Returns an error listing the unset variables.
    pub fn credentials(&self) -> Result<CloudCredentials, String> {
        let mut missing = Vec::new();
        if self.project_id.is_none() {
            missing.push(PROJECT_ENV_VARS[0]);
        }
        if self.cloudflare_api_token.is_none() {
            missing.push(SystemTestEnv::CloudflareApiToken.as_str());
        }
        if self.cloudflare_zone_id.is_none() {
            missing.push(SystemTestEnv::CloudflareZoneId.as_str());
        }
        match (&self.project_id, &self.cloudflare_api_token, &self.cloudflare_zone_id) {
            (Some(project_id), Some(token), Some(zone)) => Ok(CloudCredentials {
                project_id: project_id.clone(),
                cloudflare_api_token: token.clone(),
                cloudflare_zone_id: zone.clone(),
            }),
            _ => Err(format!("{} must be set", missing.join(", "))),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the workspace root this crate was built from.
fn default_repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
