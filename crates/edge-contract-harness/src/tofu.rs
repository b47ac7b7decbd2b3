// crates/edge-contract-harness/src/tofu.rs
// ============================================================================
// Module: Tofu Wrapper
// Description: Typed OpenTofu invocations with an init-first typestate.
// Purpose: Build tofu argument lists and decode their JSON output.
// Dependencies: edge-contract-core, edge-contract-config, serde_json
// ============================================================================

//! ## Overview
//! [`Tofu`] holds the binary, flags, and input variables for one module
//! directory. Only [`Tofu::init`] is available on a fresh wrapper; it returns
//! an [`Initialized`] workspace exposing `plan`, `plan_json`, `apply`,
//! `output`, and `state_list`. Mutating calls go through the retry policy.
//!
//! Input variables are JSON values rendered as HCL literals: top-level
//! strings are passed raw, everything else uses HCL collection syntax.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use edge_contract_config::EdgeContractConfig;
use edge_contract_config::HarnessEnvConfig;
use edge_contract_config::ModuleConfig;
use edge_contract_core::Checks;
use edge_contract_core::Outputs;
use edge_contract_core::PlanIndex;
use edge_contract_core::parse_outputs;
use edge_contract_core::security::HTTPS_PORT;
use edge_contract_core::security::exposure_outcome;
use serde_json::Value;

use crate::error::HarnessError;
use crate::error::ToolFailure;
use crate::events::EventOutcome;
use crate::events::HarnessEvent;
use crate::invoker::CommandOutput;
use crate::invoker::CommandSpec;
use crate::invoker::Invoker;
use crate::lifecycle::Deployment;
use crate::lifecycle::unique_id;
use crate::retry::RetryPolicy;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message printed by `state list` when no state exists yet.
const NO_STATE_MARKER: &str = "No state file was found";

// ============================================================================
// SECTION: Options
// ============================================================================

/// Flags and inputs for one module directory.
#[derive(Debug, Clone, PartialEq)]
pub struct TofuOptions {
    /// Module working directory.
    pub dir: PathBuf,
    /// Input variables.
    pub vars: BTreeMap<String, Value>,
    /// Variable files.
    pub var_files: Vec<PathBuf>,
    /// Backend configuration pairs for `init`.
    pub backend_config: BTreeMap<String, String>,
    /// Pass `-no-color`.
    pub no_color: bool,
    /// Pass `-reconfigure` to `init`.
    pub reconfigure: bool,
    /// Pass `-upgrade` to `init`.
    pub upgrade: bool,
    /// Pass `-force-copy` to `init`.
    pub force_copy: bool,
    /// State locking; `false` passes `-lock=false`.
    pub lock: bool,
    /// Extra environment for every call.
    pub env: BTreeMap<String, String>,
}

impl TofuOptions {
    /// Options for `dir` with color disabled and locking enabled.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            vars: BTreeMap::new(),
            var_files: Vec::new(),
            backend_config: BTreeMap::new(),
            no_color: true,
            reconfigure: false,
            upgrade: false,
            force_copy: false,
            lock: true,
            env: BTreeMap::new(),
        }
    }

    /// Options for a configured module running from `dir`.
    #[must_use]
    pub fn from_module(module: &ModuleConfig, dir: &Path) -> Self {
        let mut options = Self::new(dir);
        options.vars.clone_from(&module.vars);
        options.var_files = module.var_files.iter().map(PathBuf::from).collect();
        options.backend_config.clone_from(&module.backend);
        options
    }

    /// Sets an input variable.
    #[must_use]
    pub fn var(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.vars.insert(name.to_string(), value.into());
        self
    }

    /// Adds a variable file.
    #[must_use]
    pub fn var_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.var_files.push(path.into());
        self
    }

    /// Adds a backend configuration pair.
    #[must_use]
    pub fn backend(mut self, key: &str, value: &str) -> Self {
        self.backend_config.insert(key.to_string(), value.to_string());
        self
    }

    /// Adds an environment override.
    #[must_use]
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Arguments for `init`.
    #[must_use]
    pub fn init_args(&self) -> Vec<String> {
        let mut args = vec!["init".to_string(), "-input=false".to_string()];
        self.push_common(&mut args, true);
        if self.reconfigure {
            args.push("-reconfigure".to_string());
        }
        if self.upgrade {
            args.push("-upgrade".to_string());
        }
        if self.force_copy {
            args.push("-force-copy".to_string());
        }
        for (key, value) in &self.backend_config {
            args.push(format!("-backend-config={key}={value}"));
        }
        args
    }

    /// Arguments for `plan`, optionally saving to `out`.
    #[must_use]
    pub fn plan_args(&self, out: Option<&Path>) -> Vec<String> {
        let mut args = vec!["plan".to_string(), "-input=false".to_string()];
        self.push_common(&mut args, true);
        if let Some(out) = out {
            args.push(format!("-out={}", out.display()));
        }
        args.extend(self.var_args());
        args
    }

    /// Arguments for applying a saved plan.
    #[must_use]
    pub fn apply_args(&self, planfile: &Path) -> Vec<String> {
        let mut args =
            vec!["apply".to_string(), "-input=false".to_string(), "-auto-approve".to_string()];
        self.push_common(&mut args, true);
        args.push(planfile.display().to_string());
        args
    }

    /// Arguments for `destroy`.
    #[must_use]
    pub fn destroy_args(&self) -> Vec<String> {
        let mut args =
            vec!["destroy".to_string(), "-input=false".to_string(), "-auto-approve".to_string()];
        self.push_common(&mut args, true);
        args.extend(self.var_args());
        args
    }

    /// Arguments for a read-only subcommand (`validate`, `output -json`, ...).
    #[must_use]
    pub fn read_args(&self, subcommand: &[&str]) -> Vec<String> {
        let mut args: Vec<String> = subcommand.iter().map(ToString::to_string).collect();
        self.push_common(&mut args, false);
        args
    }

    /// `-var` and `-var-file` flags.
    #[must_use]
    pub fn var_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self
            .var_files
            .iter()
            .map(|path| format!("-var-file={}", path.display()))
            .collect();
        args.extend(self.vars.iter().map(|(name, value)| format!("-var={name}={}", hcl_literal(value))));
        args
    }

    /// Appends color and lock flags.
    fn push_common(&self, args: &mut Vec<String>, locking: bool) {
        if self.no_color {
            args.push("-no-color".to_string());
        }
        if locking && !self.lock {
            args.push("-lock=false".to_string());
        }
    }
}

/// Renders a JSON value as an HCL literal for `-var`.
#[must_use]
pub fn hcl_literal(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => hcl_nested(other),
    }
}

/// Renders a nested HCL value with quoted strings.
fn hcl_nested(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => hcl_string(text),
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(hcl_nested).collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Object(map) => {
            let rendered: Vec<String> = map
                .iter()
                .map(|(key, item)| format!("{} = {}", hcl_string(key), hcl_nested(item)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
    }
}

/// Quotes a string, escaping template sequences.
fn hcl_string(text: &str) -> String {
    let quoted = Value::String(text.to_string()).to_string();
    quoted.replace("${", "$${").replace("%{", "%%{")
}

// ============================================================================
// SECTION: Uninitialized Workspace
// ============================================================================

/// A module directory that has not been initialized yet.
#[derive(Clone)]
pub struct Tofu {
    /// `tofu` binary.
    binary: String,
    /// Process runner.
    invoker: Invoker,
    /// Retry policy for mutating calls.
    retry: RetryPolicy,
    /// Per-command limit.
    timeout: Option<Duration>,
    /// Flags and inputs.
    options: TofuOptions,
}

impl Tofu {
    /// Creates a wrapper.
    #[must_use]
    pub fn new(
        binary: impl Into<String>,
        invoker: Invoker,
        retry: RetryPolicy,
        options: TofuOptions,
    ) -> Self {
        Self {
            binary: binary.into(),
            invoker,
            retry,
            timeout: None,
            options,
        }
    }

    /// Creates a wrapper from config, letting environment overrides win.
    ///
    /// # Errors
    ///
    /// Returns an error when a retry pattern is invalid.
    pub fn from_config(
        config: &EdgeContractConfig,
        env: &HarnessEnvConfig,
        invoker: Invoker,
        mut options: TofuOptions,
    ) -> Result<Self, HarnessError> {
        options.no_color = config.tofu.no_color;
        options.lock = config.tofu.lock;
        let binary = env.tofu_binary.clone().unwrap_or_else(|| config.tofu.binary.clone());
        let retry = RetryPolicy::from_config(&config.retry)?;
        Ok(Self::new(binary, invoker, retry, options)
            .with_timeout(env.timeout.unwrap_or_else(|| config.tofu.command_timeout())))
    }

    /// Sets the per-command limit.
    #[must_use]
    pub const fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &TofuOptions {
        &self.options
    }

    /// Runs `tofu init`.
    ///
    /// # Errors
    ///
    /// Returns an error when init fails after retries.
    pub fn init(self) -> Result<Initialized, HarnessError> {
        let spec = self.spec(self.options.init_args());
        self.retry.run(self.invoker.sink(), "init", || self.invoker.run(&spec))?;
        Ok(Initialized {
            tofu: self,
        })
    }

    /// Builds a command spec for this workspace.
    fn spec(&self, args: Vec<String>) -> CommandSpec {
        let mut spec = CommandSpec::new(self.binary.clone())
            .args(args)
            .cwd(self.options.dir.clone())
            .env("TF_IN_AUTOMATION", "1");
        for (key, value) in &self.options.env {
            spec = spec.env(key.clone(), value.clone());
        }
        if let Some(limit) = self.timeout {
            spec = spec.timeout(limit);
        }
        spec
    }
}

// ============================================================================
// SECTION: Initialized Workspace
// ============================================================================

/// An initialized module directory.
pub struct Initialized {
    /// Underlying wrapper.
    tofu: Tofu,
}

impl Initialized {
    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &TofuOptions {
        &self.tofu.options
    }

    /// Returns the invoker.
    #[must_use]
    pub const fn invoker(&self) -> &Invoker {
        &self.tofu.invoker
    }

    /// Runs `tofu validate`.
    ///
    /// # Errors
    ///
    /// Returns an error when validation fails.
    pub fn validate(&self) -> Result<CommandOutput, HarnessError> {
        self.tofu.invoker.run(&self.tofu.spec(self.options().read_args(&["validate"])))
    }

    /// Runs `tofu plan` and requires success.
    ///
    /// # Errors
    ///
    /// Returns an error when planning fails.
    pub fn plan(&self) -> Result<CommandOutput, HarnessError> {
        self.tofu.invoker.run(&self.tofu.spec(self.options().plan_args(None)))
    }

    /// Runs `tofu plan` and returns its output even on failure.
    ///
    /// # Errors
    ///
    /// Returns an error only when the tool cannot be invoked.
    pub fn plan_unchecked(&self) -> Result<CommandOutput, HarnessError> {
        self.tofu.invoker.run_unchecked(&self.tofu.spec(self.options().plan_args(None)))
    }

    /// Plans to a file and indexes `tofu show -json` of it.
    ///
    /// # Errors
    ///
    /// Returns an error when planning fails or the JSON cannot be decoded.
    pub fn plan_json(&self) -> Result<PlanIndex, HarnessError> {
        let planfile = self.planfile();
        let result = self.plan_to(&planfile).and_then(|()| self.show_json(&planfile));
        remove_quietly(&planfile);
        result
    }

    /// Plans, applies the saved plan, and checks port-443 exposure.
    ///
    /// The returned guard destroys the deployment when dropped. When the
    /// exposure check fails the guard is dropped here, so the deployment is
    /// destroyed before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error when plan or apply fail, or when a planned firewall
    /// opens tcp:443 to the internet.
    pub fn apply(&self) -> Result<Deployment<'_>, HarnessError> {
        let planfile = self.planfile();
        let plan = self.plan_to(&planfile).and_then(|()| self.show_json(&planfile));
        let plan = match plan {
            Ok(plan) => plan,
            Err(err) => {
                remove_quietly(&planfile);
                return Err(err);
            }
        };
        let spec = self.tofu.spec(self.options().apply_args(&planfile));
        let applied = self.tofu.retry.run(self.tofu.invoker.sink(), "apply", || self.tofu.invoker.run(&spec));
        remove_quietly(&planfile);
        let deployment = Deployment::new(self, plan);
        applied?;
        let outcome = exposure_outcome(deployment.plan(), HTTPS_PORT);
        let mut checks = Checks::new("post-apply exposure");
        checks.check("no firewall opens tcp:443 to 0.0.0.0/0", outcome);
        checks.finish()?;
        Ok(deployment)
    }

    /// Runs `tofu destroy`.
    ///
    /// # Errors
    ///
    /// Returns an error when destroy fails after retries.
    pub fn destroy(&self) -> Result<CommandOutput, HarnessError> {
        let spec = self.tofu.spec(self.options().destroy_args());
        self.tofu.retry.run(self.tofu.invoker.sink(), "destroy", || self.tofu.invoker.run(&spec))
    }

    /// Reads `tofu output -json`.
    ///
    /// # Errors
    ///
    /// Returns an error when the command fails or the JSON is malformed.
    pub fn output(&self) -> Result<Outputs, HarnessError> {
        let output =
            self.tofu.invoker.run(&self.tofu.spec(self.options().read_args(&["output", "-json"])))?;
        Ok(parse_outputs(&output.stdout)?)
    }

    /// Lists resource addresses in state; empty when no state exists.
    ///
    /// # Errors
    ///
    /// Returns an error when the command fails for any other reason.
    pub fn state_list(&self) -> Result<Vec<String>, HarnessError> {
        let spec = self.tofu.spec(self.options().read_args(&["state", "list"]));
        let output = self.tofu.invoker.run_unchecked(&spec)?;
        if output.success() {
            return Ok(output
                .stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect());
        }
        if output.combined.contains(NO_STATE_MARKER) {
            return Ok(Vec::new());
        }
        Err(ToolFailure {
            command: spec.display(),
            status: output.status,
            output: output.combined,
        }
        .into())
    }

    /// Records a lifecycle event on the invoker's sink.
    pub(crate) fn record(&self, event: &'static str, outcome: EventOutcome, detail: &str) {
        self.tofu.invoker.sink().record(
            &HarnessEvent::new(event, "tofu", outcome)
                .with("dir", self.options().dir.display().to_string())
                .with("detail", detail),
        );
    }

    /// Plans into `planfile`.
    fn plan_to(&self, planfile: &Path) -> Result<(), HarnessError> {
        self.tofu.invoker.run(&self.tofu.spec(self.options().plan_args(Some(planfile))))?;
        Ok(())
    }

    /// Indexes `tofu show -json planfile`.
    fn show_json(&self, planfile: &Path) -> Result<PlanIndex, HarnessError> {
        let mut args = self.options().read_args(&["show", "-json"]);
        args.push(planfile.display().to_string());
        let output = self.tofu.invoker.run(&self.tofu.spec(args))?;
        Ok(PlanIndex::from_json_str(&output.stdout)?)
    }

    /// Returns a fresh plan file path inside the working directory.
    fn planfile(&self) -> PathBuf {
        self.options().dir.join(format!("edge-contract-{}.tfplan", unique_id()))
    }
}

/// Removes a scratch file, ignoring failures.
fn remove_quietly(path: &Path) {
    let _ = fs::remove_file(path);
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use serde_json::json;

    use super::*;

    #[test]
    fn hcl_literals_cover_every_json_shape() {
        assert_eq!(hcl_literal(&json!("nonprod")), "nonprod");
        assert_eq!(hcl_literal(&json!(true)), "true");
        assert_eq!(hcl_literal(&json!(3)), "3");
        assert_eq!(
            hcl_literal(&json!(["173.245.48.0/20", "103.21.244.0/22"])),
            r#"["173.245.48.0/20", "103.21.244.0/22"]"#
        );
        assert_eq!(
            hcl_literal(&json!({"managed-by": "opentofu", "count": 2})),
            r#"{"count" = 2, "managed-by" = "opentofu"}"#
        );
        assert_eq!(hcl_literal(&json!(["${var.x}"])), r#"["$${var.x}"]"#);
    }

    #[test]
    fn plan_args_carry_vars_and_flags() {
        let mut options = TofuOptions::new("/work/core")
            .var("project_suffix", "nonprod")
            .var("enable_waf", true)
            .var_file("nonprod.tfvars");
        options.lock = false;
        let args = options.plan_args(Some(Path::new("/work/core/out.tfplan")));
        assert_eq!(
            args,
            vec![
                "plan",
                "-input=false",
                "-no-color",
                "-lock=false",
                "-out=/work/core/out.tfplan",
                "-var-file=nonprod.tfvars",
                "-var=enable_waf=true",
                "-var=project_suffix=nonprod",
            ]
        );
    }

    #[test]
    fn init_args_carry_backend_and_migration_flags() {
        let mut options =
            TofuOptions::new("/work").backend("bucket", "tfstate").backend("prefix", "core");
        options.reconfigure = true;
        options.force_copy = true;
        assert_eq!(
            options.init_args(),
            vec![
                "init",
                "-input=false",
                "-no-color",
                "-reconfigure",
                "-force-copy",
                "-backend-config=bucket=tfstate",
                "-backend-config=prefix=core",
            ]
        );
    }

    #[test]
    fn read_args_never_pass_lock_flags() {
        let mut options = TofuOptions::new("/work");
        options.lock = false;
        options.no_color = false;
        assert_eq!(options.read_args(&["output", "-json"]), vec!["output", "-json"]);
    }

    #[test]
    fn apply_args_use_the_saved_plan_without_vars() {
        let options = TofuOptions::new("/work").var("region", "northamerica-northeast2");
        let args = options.apply_args(Path::new("saved.tfplan"));
        assert_eq!(args, vec!["apply", "-input=false", "-auto-approve", "-no-color", "saved.tfplan"]);
    }
}
