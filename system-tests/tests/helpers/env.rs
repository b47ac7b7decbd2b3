// system-tests/tests/helpers/env.rs
// ============================================================================
// Module: System Test Environment Helpers
// Description: Harness assembly and per-test module workspaces.
// Purpose: Check credentials first, then hand out isolated tofu workspaces.
// Dependencies: system-tests, edge-contract-config, edge-contract-harness
// ============================================================================

//! ## Overview
//! [`SystemHarness::load`] resolves configuration, the event sink, and the
//! cloud credentials. Each [`ModuleWorkspace`] owns a scratch copy of a
//! module, so parallel tests never share a `.terraform` directory.

use std::path::Path;
use std::path::PathBuf;

use edge_contract_config::CONFIG_ENV_VAR;
use edge_contract_config::EdgeContractConfig;
use edge_contract_config::HarnessEnvConfig;
use edge_contract_config::read_env_nonempty;
use edge_contract_harness::Gcloud;
use edge_contract_harness::HarnessError;
use edge_contract_harness::Initialized;
use edge_contract_harness::Invoker;
use edge_contract_harness::ModuleCopy;
use edge_contract_harness::Tofu;
use edge_contract_harness::TofuOptions;
use edge_contract_harness::copy_module_to_temp;
use edge_contract_harness::resolve_sink;
use system_tests::config::CloudCredentials;
use system_tests::config::SystemTestConfig;

use super::fixtures::ModuleVars;
use super::fixtures::REGION;

/// Default config file name at the repository root.
const CONFIG_FILE: &str = "edge-contract.toml";

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Everything a suite needs before touching the cloud.
pub struct SystemHarness {
    /// Harness configuration.
    pub config: EdgeContractConfig,
    /// Harness environment overrides.
    pub env: HarnessEnvConfig,
    /// Repository paths and credentials.
    pub system: SystemTestConfig,
    /// Verified credentials.
    pub credentials: CloudCredentials,
    /// Shared process runner.
    pub invoker: Invoker,
}

impl SystemHarness {
    /// Loads configuration and fails when a credential is missing.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Precondition`] for missing credentials or bad
    /// environment values, and config or sink errors otherwise.
    pub fn load() -> Result<Self, HarnessError> {
        let system = SystemTestConfig::load().map_err(HarnessError::Precondition)?;
        let credentials = system.credentials().map_err(HarnessError::Precondition)?;
        let env = HarnessEnvConfig::load().map_err(HarnessError::Precondition)?;
        let config = match config_path(&system)? {
            Some(path) => EdgeContractConfig::load(Some(&path))?,
            None => EdgeContractConfig::default(),
        };
        let sink = resolve_sink(env.log.as_ref(), &config.logging)?;
        Ok(Self {
            config,
            env,
            system,
            credentials,
            invoker: Invoker::new(sink),
        })
    }

    /// Copies `module` to scratch space and runs `tofu init` there.
    ///
    /// # Errors
    ///
    /// Returns an error when the copy or init fails.
    pub fn workspace(
        &self,
        module: &str,
        label: &str,
        vars: &ModuleVars,
    ) -> Result<ModuleWorkspace, HarnessError> {
        let configured = self.config.modules.get(module);
        let source = configured
            .map_or_else(|| self.system.module_dir(module), |entry| self.system.repo_root.join(entry.path()));
        let copy = copy_module_to_temp(&source, label)?;
        let mut options = configured.map_or_else(
            || TofuOptions::new(copy.path()),
            |entry| TofuOptions::from_module(entry, copy.path()),
        );
        for (name, value) in vars.values() {
            options = options.var(name, value.clone());
        }
        let tofu = Tofu::from_config(&self.config, &self.env, self.invoker.clone(), options)?.init()?;
        Ok(ModuleWorkspace {
            tofu,
            copy,
        })
    }

    /// Returns a `gcloud` client bound to the test project and region.
    #[must_use]
    pub fn gcloud(&self) -> Gcloud {
        Gcloud::new(self.invoker.clone(), self.credentials.project_id.clone()).with_region(REGION)
    }
}

// ============================================================================
// SECTION: Module Workspace
// ============================================================================

/// An initialized scratch copy of one module.
pub struct ModuleWorkspace {
    /// Initialized workspace; declared first so it drops before the copy.
    tofu: Initialized,
    /// Scratch copy.
    copy: ModuleCopy,
}

impl ModuleWorkspace {
    /// Returns the initialized workspace.
    #[must_use]
    pub const fn tofu(&self) -> &Initialized {
        &self.tofu
    }

    /// Returns the copied module directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.copy.path()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config file: `EDGE_CONTRACT_CONFIG`, then the repo default.
fn config_path(system: &SystemTestConfig) -> Result<Option<PathBuf>, HarnessError> {
    if let Some(path) = read_env_nonempty(CONFIG_ENV_VAR).map_err(HarnessError::Precondition)? {
        return Ok(Some(PathBuf::from(path)));
    }
    let default = system.repo_root.join(CONFIG_FILE);
    Ok(default.is_file().then_some(default))
}
