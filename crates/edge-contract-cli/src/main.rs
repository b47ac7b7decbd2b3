// crates/edge-contract-cli/src/main.rs
// ============================================================================
// Module: Edge Contract CLI Entry Point
// Description: Command dispatcher for offline plan and report checks.
// Purpose: Run contract checks over saved plans without cloud credentials.
// Dependencies: clap, edge-contract-core, edge-contract-harness, serde, thiserror
// ============================================================================

//! ## Overview
//! `edge-contract` works on artifacts that already exist on disk: the JSON
//! rendering of a plan, `tofu output -json` captures, Checkov reports, and
//! feature files. It never spawns `tofu` or talks to a cloud API.
//!
//! Exit codes: 0 when everything passed, 2 when a contract failed, 1 for
//! usage, input, or decoding errors. Inputs are untrusted and read with size
//! limits.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use edge_contract_config::CONFIG_ENV_VAR;
use edge_contract_config::EdgeContractConfig;
use edge_contract_core::Checks;
use edge_contract_core::ContractSuite;
use edge_contract_core::Outputs;
use edge_contract_core::PlanIndex;
use edge_contract_core::Severity;
use edge_contract_core::ThreatReport;
use edge_contract_core::index::ActionCounts;
use edge_contract_core::security::exposure_outcome;
use edge_contract_harness::scenario::Feature;
use edge_contract_harness::scenario::TagFilter;
use edge_contract_harness::scenario::features::bare_tag;
use edge_contract_harness::scenario::features::scenarios;
use edge_contract_harness::scenario::features::steps_for;
use edge_contract_harness::scenario::load_feature;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum plan JSON size accepted.
const MAX_PLAN_BYTES: usize = 64 * 1024 * 1024;

/// Maximum outputs, contract, or report size accepted.
const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

/// Ports scanned by `exposure` when none are given.
const DEFAULT_EXPOSURE_PORTS: [u16; 3] = [443, 22, 3389];

/// Exit code for a failed contract.
const CONTRACT_FAILED_EXIT: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "edge-contract", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Harness config path (overrides `EDGE_CONTRACT_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarize a plan JSON document.
    Index(IndexCommand),
    /// Evaluate a contract file against a plan.
    Check(CheckCommand),
    /// Scan planned firewalls for internet exposure.
    Exposure(ExposureCommand),
    /// Bucket a Checkov report and gate on severity.
    Threats(ThreatsCommand),
    /// Feature file utilities.
    Features {
        /// Selected features subcommand.
        #[command(subcommand)]
        command: FeaturesCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `index`.
#[derive(Args, Debug)]
struct IndexCommand {
    /// Plan JSON from `tofu show -json`.
    #[arg(long, value_name = "PATH")]
    plan: PathBuf,
    /// Include every resource address.
    #[arg(long, action = ArgAction::SetTrue)]
    addresses: bool,
}

/// Arguments for `check`.
#[derive(Args, Debug)]
struct CheckCommand {
    /// Plan JSON from `tofu show -json`.
    #[arg(long, value_name = "PATH")]
    plan: PathBuf,
    /// Contract suite (`.toml` or `.json`).
    #[arg(long, value_name = "PATH")]
    contract: PathBuf,
    /// Captured `tofu output -json`, for output assertions.
    #[arg(long, value_name = "PATH")]
    outputs: Option<PathBuf>,
}

/// Arguments for `exposure`.
#[derive(Args, Debug)]
struct ExposureCommand {
    /// Plan JSON from `tofu show -json`.
    #[arg(long, value_name = "PATH")]
    plan: PathBuf,
    /// Ports to scan (repeatable); defaults to 443, 22, and 3389.
    #[arg(long = "port", value_name = "PORT")]
    ports: Vec<u16>,
}

/// Arguments for `threats`.
#[derive(Args, Debug)]
struct ThreatsCommand {
    /// Checkov JSON report.
    #[arg(long, value_name = "PATH")]
    report: PathBuf,
    /// Print the markdown summary instead of counts.
    #[arg(long, action = ArgAction::SetTrue)]
    summary: bool,
    /// Severity that fails the gate (defaults to the config value).
    #[arg(long, value_enum, value_name = "SEVERITY")]
    fail_on: Option<SeverityArg>,
}

/// Feature subcommands.
#[derive(Subcommand, Debug)]
enum FeaturesCommand {
    /// Parse feature files and list their scenarios.
    List(FeaturesListCommand),
}

/// Arguments for `features list`.
#[derive(Args, Debug)]
struct FeaturesListCommand {
    /// Feature files.
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,
    /// Tag expression, e.g. `@integration not @slow`.
    #[arg(long, value_name = "EXPR")]
    tags: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the harness config.
    Validate,
}

/// Severity threshold argument.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SeverityArg {
    /// Critical findings.
    Critical,
    /// High or worse.
    High,
    /// Medium or worse.
    Medium,
    /// Any finding.
    Low,
}

impl From<SeverityArg> for Severity {
    fn from(value: SeverityArg) -> Self {
        match value {
            SeverityArg::Critical => Self::Critical,
            SeverityArg::High => Self::High,
            SeverityArg::Medium => Self::Medium,
            SeverityArg::Low => Self::Low,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Outcome of a command that evaluated a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// Every check passed.
    Passed,
    /// At least one check failed.
    Failed,
}

impl Verdict {
    /// Derives a verdict from a pass flag.
    const fn from_passed(passed: bool) -> Self {
        if passed { Self::Passed } else { Self::Failed }
    }

    /// Maps the verdict to a process exit code.
    fn exit_code(self) -> ExitCode {
        match self {
            Self::Passed => ExitCode::SUCCESS,
            Self::Failed => ExitCode::from(CONTRACT_FAILED_EXIT),
        }
    }
}

/// Rendered command output plus verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Report {
    /// Text for stdout.
    text: String,
    /// Verdict.
    verdict: Verdict,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        write_stdout_line(&format!("edge-contract {}", env!("CARGO_PKG_VERSION")))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        return Err(CliError::new("no command given; run `edge-contract --help`"));
    };
    let report = match command {
        Commands::Index(command) => command_index(&command)?,
        Commands::Check(command) => command_check(&command)?,
        Commands::Exposure(command) => command_exposure(&command)?,
        Commands::Threats(command) => {
            let config = load_config(cli.config.as_deref())?;
            command_threats(&command, &config)?
        }
        Commands::Features {
            command: FeaturesCommand::List(command),
        } => command_features_list(&command)?,
        Commands::Config {
            command: ConfigCommand::Validate,
        } => command_config_validate(cli.config.as_deref())?,
    };
    write_stdout_line(report.text.trim_end())?;
    Ok(report.verdict.exit_code())
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Plan summary emitted by `index`.
#[derive(Debug, Serialize)]
struct IndexSummary {
    /// Plan schema version.
    format_version: String,
    /// Engine version.
    terraform_version: Option<String>,
    /// Number of resource changes.
    resources: usize,
    /// Planned action tallies.
    actions: ActionCounts,
    /// True when nothing would change.
    empty_diff: bool,
    /// Distinct resource types.
    resource_types: Vec<String>,
    /// Every address, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    addresses: Option<Vec<String>>,
}

/// Builds the `index` summary for a plan.
fn index_summary(index: &PlanIndex, with_addresses: bool) -> IndexSummary {
    let plan = index.plan();
    IndexSummary {
        format_version: plan.format_version().to_string(),
        terraform_version: plan.terraform_version().map(str::to_string),
        resources: index.len(),
        actions: index.action_counts(),
        empty_diff: index.is_empty_diff(),
        resource_types: index.resource_types().into_iter().map(str::to_string).collect(),
        addresses: with_addresses
            .then(|| index.iter().map(|change| change.address.clone()).collect()),
    }
}

/// Executes `index`.
fn command_index(command: &IndexCommand) -> CliResult<Report> {
    let index = load_plan(&command.plan)?;
    let summary = index_summary(&index, command.addresses);
    let text = serde_json::to_string_pretty(&summary)
        .map_err(|err| CliError::new(format!("failed to render summary: {err}")))?;
    Ok(Report {
        text,
        verdict: Verdict::Passed,
    })
}

/// Executes `check`.
fn command_check(command: &CheckCommand) -> CliResult<Report> {
    let index = load_plan(&command.plan)?;
    let suite = load_suite(&command.contract)?;
    let outputs = command.outputs.as_deref().map(load_outputs).transpose()?;
    let checks = suite.run(&index, outputs.as_ref());
    Ok(Report {
        text: render_checks(&checks),
        verdict: Verdict::from_passed(checks.all_passed()),
    })
}

/// Executes `exposure`.
fn command_exposure(command: &ExposureCommand) -> CliResult<Report> {
    let index = load_plan(&command.plan)?;
    let ports = if command.ports.is_empty() { DEFAULT_EXPOSURE_PORTS.to_vec() } else { command.ports.clone() };
    Ok(exposure_report(&index, &ports))
}

/// Scans `ports` for public exposure.
fn exposure_report(index: &PlanIndex, ports: &[u16]) -> Report {
    let mut checks = Checks::new("firewall exposure");
    for port in ports {
        checks.check(format!("tcp:{port} is not open to 0.0.0.0/0"), exposure_outcome(index, *port));
    }
    Report {
        text: render_checks(&checks),
        verdict: Verdict::from_passed(checks.all_passed()),
    }
}

/// Executes `threats`.
fn command_threats(command: &ThreatsCommand, config: &EdgeContractConfig) -> CliResult<Report> {
    let bytes = read_bytes_with_limit(&command.report, MAX_DOCUMENT_BYTES)?;
    let text = utf8(&command.report, bytes)?;
    let report = ThreatReport::from_checkov_str(&text)
        .map_err(|err| CliError::new(format!("{}: {err}", command.report.display())))?;
    let fail_on = command.fail_on.map_or(config.checkov.fail_on, Severity::from);
    Ok(threat_report(&report, fail_on, command.summary))
}

/// Renders a threat report and applies the severity gate.
fn threat_report(report: &ThreatReport, fail_on: Severity, summary: bool) -> Report {
    let blocking = report.count_at_least(fail_on);
    let text = if summary {
        report.summary_markdown()
    } else {
        let counts = report.counts();
        format!(
            "critical: {}\nhigh: {}\nmedium: {}\nlow: {}\nblocking (>= {}): {blocking}",
            counts.critical,
            counts.high,
            counts.medium,
            counts.low,
            fail_on.as_str()
        )
    };
    Report {
        text,
        verdict: Verdict::from_passed(blocking == 0),
    }
}

/// Executes `features list`.
fn command_features_list(command: &FeaturesListCommand) -> CliResult<Report> {
    let filter = TagFilter::parse(command.tags.as_deref().unwrap_or_default())
        .map_err(|err| CliError::new(err.to_string()))?;
    let mut lines = Vec::new();
    for path in &command.paths {
        let feature = load_feature(path).map_err(|err| CliError::new(err.to_string()))?;
        lines.extend(feature_lines(&feature, &filter));
    }
    Ok(Report {
        text: lines.join("\n"),
        verdict: Verdict::Passed,
    })
}

/// Lists a feature's selected scenarios.
fn feature_lines(feature: &Feature, filter: &TagFilter) -> Vec<String> {
    let mut lines = vec![format!("Feature: {}", feature.name)];
    for (rule, scenario) in scenarios(feature) {
        if !filter.selects(feature, rule, scenario) {
            continue;
        }
        let steps = steps_for(feature, rule, scenario).count();
        let mut line = format!("  {}: {} ({steps} steps)", scenario.position.line, scenario.name);
        if !scenario.tags.is_empty() {
            let tags: Vec<String> = scenario.tags.iter().map(|tag| format!("@{}", bare_tag(tag))).collect();
            line.push_str(&format!(" {}", tags.join(" ")));
        }
        lines.push(line);
    }
    lines
}

/// Executes `config validate`.
fn command_config_validate(path: Option<&Path>) -> CliResult<Report> {
    let config = EdgeContractConfig::load(path).map_err(|err| CliError::new(err.to_string()))?;
    let modules: Vec<&str> = config.modules.keys().map(String::as_str).collect();
    Ok(Report {
        text: format!("config ok; modules: {}", if modules.is_empty() { "none".to_string() } else { modules.join(", ") }),
        verdict: Verdict::Passed,
    })
}

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// Loads config from an explicit path or the environment, else defaults.
fn load_config(path: Option<&Path>) -> CliResult<EdgeContractConfig> {
    if path.is_none() && std::env::var_os(CONFIG_ENV_VAR).is_none() {
        return Ok(EdgeContractConfig::default());
    }
    EdgeContractConfig::load(path).map_err(|err| CliError::new(err.to_string()))
}

/// Reads and indexes a plan file.
fn load_plan(path: &Path) -> CliResult<PlanIndex> {
    let bytes = read_bytes_with_limit(path, MAX_PLAN_BYTES)?;
    let text = utf8(path, bytes)?;
    PlanIndex::from_json_str(&text).map_err(|err| CliError::new(format!("{}: {err}", path.display())))
}

/// Reads a `tofu output -json` capture.
fn load_outputs(path: &Path) -> CliResult<Outputs> {
    let bytes = read_bytes_with_limit(path, MAX_DOCUMENT_BYTES)?;
    let text = utf8(path, bytes)?;
    Outputs::from_json_str(&text).map_err(|err| CliError::new(format!("{}: {err}", path.display())))
}

/// Reads a contract suite as TOML, or JSON when the extension is `.json`.
fn load_suite(path: &Path) -> CliResult<ContractSuite> {
    let bytes = read_bytes_with_limit(path, MAX_DOCUMENT_BYTES)?;
    let text = utf8(path, bytes)?;
    let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        serde_json::from_str(&text).map_err(|err| err.to_string())
    } else {
        toml::from_str(&text).map_err(|err| err.to_string())
    };
    parsed.map_err(|err| CliError::new(format!("invalid contract {}: {err}", path.display())))
}

/// Reads a file, failing closed when it exceeds `max_bytes`.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> CliResult<Vec<u8>> {
    let read_error = |err: std::io::Error| CliError::new(format!("failed to read {}: {err}", path.display()));
    let file = File::open(path).map_err(read_error)?;
    let size = file.metadata().map_err(read_error)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(CliError::new(format!(
            "{} is {size} bytes, over the {max_bytes} byte limit",
            path.display()
        )));
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(read_error)?;
    if bytes.len() > max_bytes {
        return Err(CliError::new(format!("{} grew past the {max_bytes} byte limit", path.display())));
    }
    Ok(bytes)
}

/// Decodes UTF-8 input.
fn utf8(path: &Path, bytes: Vec<u8>) -> CliResult<String> {
    String::from_utf8(bytes).map_err(|_| CliError::new(format!("{} is not valid utf-8", path.display())))
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Renders check records as `PASS`/`FAIL`/`UNKNOWN` lines with a summary.
fn render_checks(checks: &Checks) -> String {
    let mut lines = Vec::with_capacity(checks.records().len() + 1);
    let mut failed = 0_usize;
    for record in checks.records() {
        if record.outcome.is_failure() {
            failed += 1;
        }
        let label = record.outcome.label();
        match record.outcome.message() {
            None => lines.push(format!("{label} {}", record.label)),
            Some(message) => lines.push(format!("{label} {}: {message}", record.label)),
        }
    }
    lines.push(format!(
        "{}: {} checks, {failed} failed",
        checks.subject(),
        checks.records().len()
    ));
    lines.join("\n")
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "error: {message}");
    ExitCode::FAILURE
}
