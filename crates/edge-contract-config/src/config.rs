// crates/edge-contract-config/src/config.rs
// ============================================================================
// Module: Edge Contract Configuration
// Description: Loading and validation of `edge-contract.toml`.
// Purpose: Strict, fail-closed harness configuration with hard limits.
// Dependencies: edge-contract-core, serde, serde_json, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration is read from a TOML file located by explicit path, then the
//! `EDGE_CONTRACT_CONFIG` environment variable, then `edge-contract.toml` in
//! the working directory. Files are size-capped, must be UTF-8, and every
//! section is validated before use. Unknown keys are rejected.
//!
//! ```toml
//! [tofu]
//! binary = "tofu"
//!
//! [modules.core]
//! dir = "deploy/opentofu/gcp/core"
//! vars = { project_suffix = "nonprod", enable_waf = true }
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use edge_contract_core::Severity;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "edge-contract.toml";
/// Environment variable that overrides the configuration path.
pub const CONFIG_ENV_VAR: &str = "EDGE_CONTRACT_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum retry attempts for mutating tofu commands.
pub(crate) const MAX_RETRY_ATTEMPTS: u32 = 10;
/// Maximum number of extra transient-error patterns.
pub(crate) const MAX_RETRY_PATTERNS: usize = 64;
/// Maximum length of one transient-error pattern.
pub(crate) const MAX_PATTERN_LENGTH: usize = 512;
/// Maximum command timeout (six hours).
pub(crate) const MAX_COMMAND_TIMEOUT_SEC: u64 = 6 * 60 * 60;
/// Maximum module count.
pub(crate) const MAX_MODULES: usize = 64;
/// Maximum variable count per module.
pub(crate) const MAX_MODULE_VARS: usize = 256;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root harness configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeContractConfig {
    /// `tofu` invocation settings.
    #[serde(default)]
    pub tofu: TofuConfig,
    /// Transient-error retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Infrastructure modules under test, keyed by short name.
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
    /// Static analysis settings.
    #[serde(default)]
    pub checkov: CheckovConfig,
    /// Structured event logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EdgeContractConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for values that fail validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tofu.validate()?;
        self.retry.validate()?;
        self.checkov.validate()?;
        self.logging.validate()?;
        if self.modules.len() > MAX_MODULES {
            return Err(ConfigError::Invalid(format!(
                "modules exceeds max count of {MAX_MODULES}"
            )));
        }
        for (name, module) in &self.modules {
            validate_identifier("modules key", name)?;
            module.validate(name)?;
        }
        Ok(())
    }

    /// Returns a module by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the module is not configured.
    pub fn module(&self, name: &str) -> Result<&ModuleConfig, ConfigError> {
        self.modules
            .get(name)
            .ok_or_else(|| ConfigError::Invalid(format!("module {name} is not configured")))
    }
}

// ============================================================================
// SECTION: Tofu
// ============================================================================

/// `tofu` invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TofuConfig {
    /// Binary name or path.
    #[serde(default = "default_tofu_binary")]
    pub binary: String,
    /// Pass `-no-color` to every command.
    #[serde(default = "default_true")]
    pub no_color: bool,
    /// Pass `-lock=false` when disabled.
    #[serde(default = "default_true")]
    pub lock: bool,
    /// Per-command timeout in seconds.
    #[serde(default = "default_command_timeout_sec")]
    pub command_timeout_sec: u64,
}

impl Default for TofuConfig {
    fn default() -> Self {
        Self {
            binary: default_tofu_binary(),
            no_color: true,
            lock: true,
            command_timeout_sec: default_command_timeout_sec(),
        }
    }
}

impl TofuConfig {
    /// Returns the command timeout.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_sec)
    }

    /// Validates tofu settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("tofu.binary", &self.binary)?;
        if self.command_timeout_sec == 0 || self.command_timeout_sec > MAX_COMMAND_TIMEOUT_SEC {
            return Err(ConfigError::Invalid(format!(
                "tofu.command_timeout_sec must be between 1 and {MAX_COMMAND_TIMEOUT_SEC}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Retry
// ============================================================================

/// Retry policy for transient provider and API errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound on the delay between attempts.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Additional transient-error regular expressions.
    #[serde(default)]
    pub extra_patterns: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            extra_patterns: Vec::new(),
        }
    }
}

impl RetryConfig {
    /// Validates retry settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "retry.max_attempts must be between 1 and {MAX_RETRY_ATTEMPTS}"
            )));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.initial_backoff_ms must not exceed retry.max_backoff_ms".to_string(),
            ));
        }
        if self.extra_patterns.len() > MAX_RETRY_PATTERNS {
            return Err(ConfigError::Invalid(format!(
                "retry.extra_patterns exceeds max count of {MAX_RETRY_PATTERNS}"
            )));
        }
        for pattern in &self.extra_patterns {
            if pattern.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "retry.extra_patterns entries must be non-empty".to_string(),
                ));
            }
            if pattern.len() > MAX_PATTERN_LENGTH {
                return Err(ConfigError::Invalid(
                    "retry.extra_patterns entry exceeds max length".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Modules
// ============================================================================

/// One infrastructure module under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    /// Module directory, relative to the repository root.
    pub dir: String,
    /// Input variables rendered as `-var` flags.
    #[serde(default)]
    pub vars: BTreeMap<String, Value>,
    /// Variable files passed with `-var-file`.
    #[serde(default)]
    pub var_files: Vec<String>,
    /// Backend configuration pairs passed to `init`.
    #[serde(default)]
    pub backend: BTreeMap<String, String>,
    /// Copy the module to a scratch directory before running.
    #[serde(default = "default_true")]
    pub copy_to_temp: bool,
}

impl ModuleConfig {
    /// Returns the module directory as a path.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.dir)
    }

    /// Validates module settings.
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        validate_path_string(&format!("modules.{name}.dir"), &self.dir)?;
        if self.vars.len() > MAX_MODULE_VARS {
            return Err(ConfigError::Invalid(format!(
                "modules.{name}.vars exceeds max count of {MAX_MODULE_VARS}"
            )));
        }
        for (key, value) in &self.vars {
            validate_identifier(&format!("modules.{name}.vars key"), key)?;
            if value.is_null() {
                return Err(ConfigError::Invalid(format!(
                    "modules.{name}.vars.{key} must not be null"
                )));
            }
        }
        for file in &self.var_files {
            validate_path_string(&format!("modules.{name}.var_files"), file)?;
        }
        for key in self.backend.keys() {
            validate_identifier(&format!("modules.{name}.backend key"), key)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Checkov
// ============================================================================

/// Static analysis settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckovConfig {
    /// Binary name or path.
    #[serde(default = "default_checkov_binary")]
    pub binary: String,
    /// Framework passed to `--framework`.
    #[serde(default = "default_checkov_framework")]
    pub framework: String,
    /// Lowest severity that fails the contract.
    #[serde(default = "default_fail_on")]
    pub fail_on: Severity,
}

impl Default for CheckovConfig {
    fn default() -> Self {
        Self {
            binary: default_checkov_binary(),
            framework: default_checkov_framework(),
            fail_on: default_fail_on(),
        }
    }
}

impl CheckovConfig {
    /// Validates checkov settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("checkov.binary", &self.binary)?;
        validate_identifier("checkov.framework", &self.framework)
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Event sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard events.
    Off,
}

/// Structured event logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: LogSinkKind,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl LoggingConfig {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (LogSinkKind::File, None) => {
                Err(ConfigError::Invalid("logging.path is required for the file sink".to_string()))
            }
            (LogSinkKind::File, Some(path)) => validate_path_string("logging.path", path),
            (_, Some(_)) => Err(ConfigError::Invalid(
                "logging.path is only valid for the file sink".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI argument, env var, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path-valued field.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an HCL-style identifier (`[A-Za-z_][A-Za-z0-9_-]*`).
fn validate_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    let valid_start = chars.next().is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    let valid_rest = chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if valid_start && valid_rest && value.len() <= MAX_PATH_COMPONENT_LENGTH {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} '{value}' is not a valid identifier")))
    }
}

/// Default tofu binary.
fn default_tofu_binary() -> String {
    "tofu".to_string()
}

/// Default checkov binary.
fn default_checkov_binary() -> String {
    "checkov".to_string()
}

/// Default checkov framework.
fn default_checkov_framework() -> String {
    "terraform".to_string()
}

/// Default failing severity.
const fn default_fail_on() -> Severity {
    Severity::Critical
}

/// Serde helper for `true` defaults.
const fn default_true() -> bool {
    true
}

/// Default command timeout (30 minutes).
const fn default_command_timeout_sec() -> u64 {
    30 * 60
}

/// Default retry attempts.
const fn default_max_attempts() -> u32 {
    3
}

/// Default initial backoff.
const fn default_initial_backoff_ms() -> u64 {
    5_000
}

/// Default backoff cap.
const fn default_max_backoff_ms() -> u64 {
    60_000
}
