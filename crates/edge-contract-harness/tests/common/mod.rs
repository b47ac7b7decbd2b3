// crates/edge-contract-harness/tests/common/mod.rs
// ============================================================================
// Module: Common Harness Fixtures
// Description: A scripted stand-in for the tofu binary and plan builders.
// Purpose: Exercise the workspace lifecycle without a real engine or cloud.
// Dependencies: edge-contract-harness, serde_json, tempfile
// ============================================================================

//! ## Overview
//! `fake-tofu` is a POSIX shell script that answers the subcommands the
//! harness issues. Each test gets its own home directory (passed through
//! `FAKE_TOFU_HOME`) holding the plan JSON, the resources `apply` writes to
//! state, outputs, and knobs such as a count of transient apply failures.
//! The script is written once per test binary so no test can exec it while
//! another still holds it open for writing.

#![allow(dead_code, reason = "Shared test helpers may be unused in some suites.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::OnceLock;

use edge_contract_config::RetryConfig;
use edge_contract_harness::Invoker;
use edge_contract_harness::MemoryEventSink;
use edge_contract_harness::RetryPolicy;
use edge_contract_harness::Tofu;
use edge_contract_harness::TofuOptions;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

/// Script body for the fake engine.
const FAKE_TOFU: &str = r#"#!/bin/sh
home="$FAKE_TOFU_HOME"
state="$home/state"
echo "$*" >> "$home/calls.log"
case "$1" in
  init)
    echo "OpenTofu has been successfully initialized!"
    ;;
  validate)
    echo "Success! The configuration is valid."
    ;;
  plan)
    if [ -f "$home/plan_error" ]; then
      cat "$home/plan_error" >&2
      exit 1
    fi
    for arg in "$@"; do
      case "$arg" in
        -out=*) : > "${arg#-out=}" ;;
      esac
    done
    echo "Plan: 2 to add, 0 to change, 0 to destroy."
    ;;
  show)
    cat "$home/plan.json"
    ;;
  apply)
    if [ -f "$home/apply_failures" ]; then
      left=$(cat "$home/apply_failures")
      if [ "$left" -gt 0 ]; then
        echo $((left - 1)) > "$home/apply_failures"
        echo "Error: googleapi: Error 503: backend unavailable" >&2
        exit 1
      fi
    fi
    cp "$home/resources" "$state"
    echo "Apply complete!"
    ;;
  destroy)
    if [ ! -f "$home/keep_state" ]; then
      rm -f "$state"
    fi
    echo "Destroy complete!"
    ;;
  state)
    if [ -f "$state" ]; then
      cat "$state"
    else
      echo "No state file was found!" >&2
      exit 1
    fi
    ;;
  output)
    cat "$home/outputs.json"
    ;;
  *)
    echo "unsupported subcommand $1" >&2
    exit 2
    ;;
esac
"#;

/// Directory holding the script for this test binary.
static SCRIPT_DIR: OnceLock<TempDir> = OnceLock::new();

/// Returns the path of the fake engine, writing it on first use.
pub fn fake_tofu_path() -> PathBuf {
    let dir = SCRIPT_DIR.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake-tofu");
        fs::write(&path, FAKE_TOFU).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        dir
    });
    dir.path().join("fake-tofu")
}

/// One test's fake engine home plus a module directory.
pub struct FakeEngine {
    /// Knob and state directory.
    pub home: TempDir,
    /// Module working directory.
    pub module: TempDir,
    /// Sink shared with the invoker.
    pub sink: Arc<MemoryEventSink>,
}

impl FakeEngine {
    /// Creates an engine whose plan is `plan` and whose state after apply
    /// lists `resources`.
    pub fn new(plan: &Value, resources: &[&str]) -> Self {
        let home = tempfile::tempdir().unwrap();
        let module = tempfile::tempdir().unwrap();
        fs::write(home.path().join("plan.json"), plan.to_string()).unwrap();
        let mut listing = resources.join("\n");
        listing.push('\n');
        fs::write(home.path().join("resources"), listing).unwrap();
        fs::write(home.path().join("outputs.json"), "{}").unwrap();
        fs::write(module.path().join("main.tf"), "# module under test\n").unwrap();
        Self {
            home,
            module,
            sink: Arc::new(MemoryEventSink::new()),
        }
    }

    /// Sets the outputs document.
    pub fn outputs(&self, outputs: &Value) {
        fs::write(self.home.path().join("outputs.json"), outputs.to_string()).unwrap();
    }

    /// Makes the next `count` applies fail with a transient error.
    pub fn fail_applies(&self, count: u32) {
        fs::write(self.home.path().join("apply_failures"), count.to_string()).unwrap();
    }

    /// Makes every plan fail with `message` on stderr.
    pub fn fail_plans(&self, message: &str) {
        fs::write(self.home.path().join("plan_error"), message).unwrap();
    }

    /// Makes destroy leave state behind.
    pub fn keep_state(&self) {
        fs::write(self.home.path().join("keep_state"), "").unwrap();
    }

    /// Returns the recorded command lines.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.home.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Returns the subcommands in call order.
    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|line| line.split_whitespace().next().map(str::to_string))
            .collect()
    }

    /// Returns true when the state file exists.
    pub fn has_state(&self) -> bool {
        self.home.path().join("state").exists()
    }

    /// Options for the module directory wired to this engine.
    pub fn options(&self) -> TofuOptions {
        TofuOptions::new(self.module.path())
            .env("FAKE_TOFU_HOME", &self.home.path().display().to_string())
    }

    /// Builds a wrapper with fast retries.
    pub fn tofu(&self, options: TofuOptions) -> Tofu {
        Tofu::new(
            fake_tofu_path().display().to_string(),
            Invoker::new(self.sink.clone()),
            fast_retry(),
            options,
        )
    }

    /// Returns files left in the module directory.
    pub fn module_files(&self) -> Vec<String> {
        list_names(self.module.path())
    }
}

/// Retry policy with millisecond backoff.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::from_config(&RetryConfig {
        max_attempts: 3,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        extra_patterns: Vec::new(),
    })
    .unwrap()
}

/// Lists file names in `dir`, sorted.
fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Builds a plan with one network and one firewall rule.
pub fn firewall_plan(source_ranges: &[&str], port: &str) -> Value {
    json!({
        "format_version": "1.2",
        "terraform_version": "1.8.5",
        "variables": {
            "project_suffix": {"value": "nonprod"},
            "enable_waf": {"value": true}
        },
        "resource_changes": [
            {
                "address": "google_compute_network.ingress_vpc",
                "mode": "managed",
                "type": "google_compute_network",
                "name": "ingress_vpc",
                "provider_name": "registry.opentofu.org/hashicorp/google",
                "change": {
                    "actions": ["create"],
                    "before": null,
                    "after": {"name": "ingress-vpc-nonprod", "auto_create_subnetworks": false}
                }
            },
            {
                "address": "google_compute_firewall.allow_edge",
                "mode": "managed",
                "type": "google_compute_firewall",
                "name": "allow_edge",
                "provider_name": "registry.opentofu.org/hashicorp/google",
                "change": {
                    "actions": ["create"],
                    "before": null,
                    "after": {
                        "name": "allow-edge",
                        "direction": "INGRESS",
                        "source_ranges": source_ranges,
                        "allow": [{"protocol": "tcp", "ports": [port]}]
                    }
                }
            }
        ],
        "output_changes": {},
        "configuration": {"root_module": {}}
    })
}
