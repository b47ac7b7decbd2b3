// crates/edge-contract-config/src/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment-backed overrides for harness runs.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Harness overrides (run root, timeout, tofu binary, event sink) come from
//! environment variables. Values must be valid UTF-8 and non-empty when set;
//! anything else fails closed instead of silently falling back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for harness configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Optional artifact run root override.
    RunRoot,
    /// Optional timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Optional `tofu` binary override.
    TofuBinary,
    /// Optional event sink (`stderr`, `off`, or a file path).
    Log,
    /// Allow reusing an existing run root (`true`/`false` or `1`/`0`).
    AllowOverwrite,
}

impl HarnessEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "EDGE_CONTRACT_RUN_ROOT",
            Self::TimeoutSeconds => "EDGE_CONTRACT_TIMEOUT_SEC",
            Self::TofuBinary => "EDGE_CONTRACT_TOFU_BIN",
            Self::Log => "EDGE_CONTRACT_LOG",
            Self::AllowOverwrite => "EDGE_CONTRACT_ALLOW_OVERWRITE",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Event sink requested through the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// JSON lines on stderr.
    Stderr,
    /// Discard events.
    Off,
    /// Append JSON lines to a file.
    File(PathBuf),
}

impl LogTarget {
    /// Parses `stderr`, `off`, or a file path.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("stderr") {
            Self::Stderr
        } else if trimmed.eq_ignore_ascii_case("off") || trimmed.eq_ignore_ascii_case("none") {
            Self::Off
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }
}

/// Typed harness overrides derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarnessEnvConfig {
    /// Optional run root override.
    pub run_root: Option<PathBuf>,
    /// Optional timeout override.
    pub timeout: Option<Duration>,
    /// Optional tofu binary override.
    pub tofu_binary: Option<String>,
    /// Optional event sink override.
    pub log: Option<LogTarget>,
    /// Allow reusing an existing run root.
    pub allow_overwrite: bool,
}

impl HarnessEnvConfig {
    /// Loads overrides from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or fails validation (for example, an invalid timeout or boolean value).
    pub fn load() -> Result<Self, String> {
        let run_root = read_env_nonempty(HarnessEnv::RunRoot.as_str())?.map(PathBuf::from);
        let timeout = read_env_nonempty(HarnessEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(HarnessEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let tofu_binary = read_env_nonempty(HarnessEnv::TofuBinary.as_str())?;
        let log = read_env_nonempty(HarnessEnv::Log.as_str())?.map(|value| LogTarget::parse(&value));
        let allow_overwrite = parse_bool_env(
            HarnessEnv::AllowOverwrite.as_str(),
            read_env_nonempty(HarnessEnv::AllowOverwrite.as_str())?,
        )?;
        Ok(Self {
            run_root,
            timeout,
            tofu_binary,
            log,
            allow_overwrite,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is set but empty or whitespace.
pub fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a positive timeout in seconds.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, String> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{name} must be a positive integer number of seconds"))?;
    if secs == 0 {
        return Err(format!("{name} must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses a boolean literal, defaulting to false when unset.
fn parse_bool_env(name: &str, raw: Option<String>) -> Result<bool, String> {
    let Some(value) = raw else {
        return Ok(false);
    };
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(format!("{name} must be 1, 0, true, or false"))
}
