// crates/edge-contract-core/src/plan.rs
// ============================================================================
// Module: Execution Plan Model
// Description: Decoding of `tofu show -json` plan documents.
// Purpose: Produce a read-only, schema-pinned view of planned resource changes.
// Dependencies: serde, serde_json, jsonpath_lib, thiserror
// ============================================================================

//! ## Overview
//! An [`ExecutionPlan`] is decoded once from the JSON rendering of a saved
//! plan and never mutated afterward. Decoding pins the plan
//! `format_version` major and enforces the change-state invariant: create,
//! update, and replace changes carry an `after` state while pure deletes do
//! not. Any violation is a [`PlanError`], never a silently skipped entry.
//!
//! Resource addresses keep their full module path so that same-named
//! resources declared by different modules stay distinct.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use jsonpath_lib::select;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;
use serde_json::Value;
use thiserror::Error;

use crate::attributes::Attributes;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Plan JSON `format_version` major accepted by the decoder.
pub const SUPPORTED_FORMAT_MAJOR: u64 = 1;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Plan decoding and lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The document is not valid JSON or does not match the plan shape.
    #[error("plan decode error: {0}")]
    Decode(String),
    /// The plan was rendered with an unsupported schema version.
    #[error("unsupported plan format_version {found} (expected {expected}.x)")]
    UnsupportedFormat {
        /// Version string found in the document.
        found: String,
        /// Supported major version.
        expected: u64,
    },
    /// A resource address could not be parsed.
    #[error("invalid resource address {address}: {reason}")]
    InvalidAddress {
        /// Raw address text.
        address: String,
        /// Parse failure reason.
        reason: String,
    },
    /// A `JSONPath` expression could not be evaluated.
    #[error("invalid jsonpath {0}")]
    InvalidJsonPath(String),
}

// ============================================================================
// SECTION: Resource Identity
// ============================================================================

/// Resource mode (`managed` resource or `data` source).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    /// A managed resource block.
    #[default]
    Managed,
    /// A data source block.
    Data,
}

/// Instance key for `count` or `for_each` resources and modules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum InstanceKey {
    /// Numeric `count` index.
    Count(u64),
    /// String `for_each` key.
    Each(String),
}

impl InstanceKey {
    /// Builds a key from the plan's `index` field.
    fn from_json(value: &Value) -> Result<Self, String> {
        match value {
            Value::Number(number) => number
                .as_u64()
                .map(Self::Count)
                .ok_or_else(|| format!("instance index {number} is not a non-negative integer")),
            Value::String(key) => Ok(Self::Each(key.clone())),
            other => Err(format!("instance index must be a number or string, got {other}")),
        }
    }

    /// Parses the text between the brackets of an address key.
    fn parse_inner(inner: &str) -> Result<Self, String> {
        if inner.starts_with('"') {
            return unquote(inner).map(Self::Each);
        }
        inner
            .parse::<u64>()
            .map(Self::Count)
            .map_err(|_| format!("instance key {inner} is neither an integer nor a quoted string"))
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(index) => write!(f, "[{index}]"),
            Self::Each(key) => write!(f, "[\"{}\"]", escape_key(key)),
        }
    }
}

/// One `module.<name>[key]` step of a module path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleStep {
    /// Module call name.
    pub name: String,
    /// Optional module instance key.
    pub key: Option<InstanceKey>,
}

impl fmt::Display for ModuleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module.{}", self.name)?;
        if let Some(key) = &self.key {
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Fully module-qualified resource address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceAddress {
    /// Module path from the root module (empty for root resources).
    pub module_path: Vec<ModuleStep>,
    /// Resource mode.
    pub mode: ResourceMode,
    /// Resource type, e.g. `google_compute_network`.
    pub resource_type: String,
    /// Local resource name.
    pub name: String,
    /// Optional instance key.
    pub key: Option<InstanceKey>,
}

impl ResourceAddress {
    /// Parses an address such as
    /// `module.core.google_compute_subnetwork.proxy_only_subnet[0]`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidAddress`] when the text is not a resource
    /// address.
    pub fn parse(raw: &str) -> Result<Self, PlanError> {
        let invalid = |reason: String| PlanError::InvalidAddress {
            address: raw.to_string(),
            reason,
        };
        let parts = split_address(raw).map_err(invalid)?;
        let (module_path, mut cursor) = take_module_steps(&parts).map_err(invalid)?;
        let mut mode = ResourceMode::Managed;
        if parts.get(cursor) == Some(&"data") {
            mode = ResourceMode::Data;
            cursor += 1;
        }
        let remaining = parts.get(cursor..).unwrap_or_default();
        let [resource_type, name] = remaining else {
            return Err(invalid("expected <type>.<name> after module path".to_string()));
        };
        if resource_type.contains('[') {
            return Err(invalid("resource type must not carry an instance key".to_string()));
        }
        let (name, key) = split_key(name).map_err(invalid)?;
        Ok(Self {
            module_path,
            mode,
            resource_type: (*resource_type).to_string(),
            name: name.to_string(),
            key,
        })
    }

    /// Returns the module address (`module.a.module.b`), or `None` for root.
    #[must_use]
    pub fn module_address(&self) -> Option<String> {
        if self.module_path.is_empty() {
            return None;
        }
        let steps: Vec<String> = self.module_path.iter().map(ToString::to_string).collect();
        Some(steps.join("."))
    }

    /// Returns true when the address lives in the given module.
    ///
    /// `None` selects the root module. Module names may be given bare
    /// (`core`) or qualified (`module.core`).
    #[must_use]
    pub fn in_module(&self, module: Option<&str>) -> bool {
        match (module, self.module_address()) {
            (None, None) => true,
            (Some(wanted), Some(actual)) => normalize_module(wanted) == actual,
            _ => false,
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.module_path {
            write!(f, "{step}.")?;
        }
        if self.mode == ResourceMode::Data {
            f.write_str("data.")?;
        }
        write!(f, "{}.{}", self.resource_type, self.name)?;
        if let Some(key) = &self.key {
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl Serialize for ResourceAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Planned action derived from a change's action list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// No change.
    NoOp,
    /// New object.
    Create,
    /// Data source read.
    Read,
    /// In-place update.
    Update,
    /// Object removal.
    Delete,
    /// Destroy-and-create in either order.
    Replace,
    /// Dropped from state while the object itself is left in place.
    Forget,
}

impl Action {
    /// Maps a plan `actions` list to a single action.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Decode`] for unrecognized action lists.
    pub fn from_actions<S: AsRef<str>>(actions: &[S]) -> Result<Self, PlanError> {
        let names: Vec<&str> = actions.iter().map(AsRef::as_ref).collect();
        match names.as_slice() {
            ["no-op"] => Ok(Self::NoOp),
            ["create"] => Ok(Self::Create),
            ["read"] => Ok(Self::Read),
            ["update"] => Ok(Self::Update),
            ["delete"] => Ok(Self::Delete),
            ["delete", "create"] | ["create", "delete"] => Ok(Self::Replace),
            ["forget"] => Ok(Self::Forget),
            _ => Err(PlanError::Decode(format!(
                "unrecognized change actions [{}]",
                names.join(", ")
            ))),
        }
    }

    /// Returns the canonical action label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoOp => "no-op",
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Replace => "replace",
            Self::Forget => "forget",
        }
    }

    /// Returns true when the action must carry an `after` state.
    #[must_use]
    pub const fn requires_after(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Replace)
    }

    /// Returns true when the action leaves no managed object behind.
    #[must_use]
    pub const fn removes_from_state(self) -> bool {
        matches!(self, Self::Delete | Self::Forget)
    }

    /// Returns true when the action changes infrastructure or state.
    #[must_use]
    pub const fn is_change(self) -> bool {
        !matches!(self, Self::NoOp | Self::Read)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Resource Changes
// ============================================================================

/// One planned resource change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceChange {
    /// Address exactly as rendered by the plan.
    pub address: String,
    /// Parsed, module-qualified identity.
    pub identity: ResourceAddress,
    /// Deposed object key, when the change targets a deposed object.
    pub deposed: Option<String>,
    /// Provider that manages the resource.
    pub provider_name: Option<String>,
    /// Planned action.
    pub action: Action,
    /// Prior attribute state.
    pub before: Option<Value>,
    /// Planned attribute state (absent for deletes).
    pub after: Option<Value>,
    /// Attributes known only after apply.
    pub after_unknown: Option<Value>,
}

impl ResourceChange {
    /// Returns the resource type.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.identity.resource_type
    }

    /// Returns the local resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Returns true when the resource is still managed after apply.
    #[must_use]
    pub const fn planned_to_exist(&self) -> bool {
        !self.action.removes_from_state()
    }

    /// Returns a typed accessor over the planned `after` state.
    #[must_use]
    pub fn attributes(&self) -> Option<Attributes<'_>> {
        self.after.as_ref().map(|after| Attributes::new(&self.address, after))
    }

    /// Returns a typed accessor over the prior `before` state.
    #[must_use]
    pub fn before_attributes(&self) -> Option<Attributes<'_>> {
        self.before.as_ref().map(|before| Attributes::new(&self.address, before))
    }

    /// Returns true when `path` is marked unknown-until-apply.
    #[must_use]
    pub fn is_unknown(&self, path: &str) -> bool {
        let Some(unknown) = &self.after_unknown else {
            return false;
        };
        Attributes::new(&self.address, unknown)
            .find(path)
            .ok()
            .flatten()
            .is_some_and(|value| value == &Value::Bool(true))
    }

    /// Validates and converts a raw change entry.
    fn from_raw(raw: RawResourceChange) -> Result<Self, PlanError> {
        if raw.address.trim().is_empty() || raw.resource_type.is_empty() || raw.name.is_empty() {
            return Err(PlanError::Decode(
                "resource change is missing address, type, or name".to_string(),
            ));
        }
        let address = raw.address;
        let action = Action::from_actions(&raw.change.actions)
            .map_err(|err| PlanError::Decode(format!("{address}: {err}")))?;
        let module_path = match raw.module_address.as_deref() {
            Some(module) => parse_module_address(module)
                .map_err(|reason| PlanError::Decode(format!("{address}: {reason}")))?,
            None => Vec::new(),
        };
        let key = raw
            .index
            .as_ref()
            .map(InstanceKey::from_json)
            .transpose()
            .map_err(|reason| PlanError::Decode(format!("{address}: {reason}")))?;
        let after = raw.change.after;
        if action.requires_after() && after.is_none() {
            return Err(PlanError::Decode(format!(
                "{address}: {action} change is missing its after state"
            )));
        }
        if action.removes_from_state() && after.is_some() {
            return Err(PlanError::Decode(format!(
                "{address}: {action} change must not carry an after state"
            )));
        }
        Ok(Self {
            identity: ResourceAddress {
                module_path,
                mode: raw.mode,
                resource_type: raw.resource_type,
                name: raw.name,
                key,
            },
            address,
            deposed: raw.deposed,
            provider_name: raw.provider_name,
            action,
            before: raw.change.before,
            after,
            after_unknown: raw.change.after_unknown,
        })
    }
}

/// Planned change to a root module output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputChange {
    /// Planned action.
    pub action: Action,
    /// Planned value when known.
    pub after: Option<Value>,
    /// True when the value is only known after apply.
    pub after_unknown: bool,
    /// True when the output is marked sensitive.
    pub sensitive: bool,
}

/// Configuration item kinds declared by the plan's `configuration` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    /// Root module input variables.
    Variable,
    /// Root module outputs.
    Output,
    /// Resource and data blocks, including those in module calls.
    Resource,
}

// ============================================================================
// SECTION: Execution Plan
// ============================================================================

/// Decoded, read-only execution plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    /// Plan schema version.
    format_version: String,
    /// Engine version that rendered the plan.
    terraform_version: Option<String>,
    /// Input variable values.
    variables: BTreeMap<String, Value>,
    /// Resource changes in plan order.
    changes: Vec<ResourceChange>,
    /// Root output changes.
    output_changes: BTreeMap<String, OutputChange>,
    /// Raw plan document for path queries.
    document: Value,
}

impl ExecutionPlan {
    /// Decodes a plan from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when the text is empty, malformed, or violates
    /// the plan invariants.
    pub fn from_json_str(text: &str) -> Result<Self, PlanError> {
        if text.trim().is_empty() {
            return Err(PlanError::Decode("plan json is empty".to_string()));
        }
        let document: Value =
            serde_json::from_str(text).map_err(|err| PlanError::Decode(err.to_string()))?;
        Self::from_value(document)
    }

    /// Decodes a plan from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when the bytes are not a valid plan document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PlanError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| PlanError::Decode("plan json must be utf-8".to_string()))?;
        Self::from_json_str(text)
    }

    /// Decodes a plan from an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when the value does not match the plan schema.
    pub fn from_value(document: Value) -> Result<Self, PlanError> {
        if !document.is_object() {
            return Err(PlanError::Decode("plan document must be a json object".to_string()));
        }
        let raw =
            RawPlan::deserialize(&document).map_err(|err| PlanError::Decode(err.to_string()))?;
        check_format_version(&raw.format_version)?;
        let mut changes = Vec::with_capacity(raw.resource_changes.len());
        for entry in raw.resource_changes {
            changes.push(ResourceChange::from_raw(entry)?);
        }
        let mut output_changes = BTreeMap::new();
        for (name, change) in raw.output_changes {
            let action = Action::from_actions(&change.actions)
                .map_err(|err| PlanError::Decode(format!("output {name}: {err}")))?;
            output_changes.insert(
                name,
                OutputChange {
                    action,
                    after: change.after,
                    after_unknown: change.after_unknown == Some(Value::Bool(true)),
                    sensitive: change.after_sensitive == Some(Value::Bool(true)),
                },
            );
        }
        let variables =
            raw.variables.into_iter().map(|(name, variable)| (name, variable.value)).collect();
        Ok(Self {
            format_version: raw.format_version,
            terraform_version: raw.terraform_version,
            variables,
            changes,
            output_changes,
            document,
        })
    }

    /// Returns the plan schema version.
    #[must_use]
    pub fn format_version(&self) -> &str {
        &self.format_version
    }

    /// Returns the engine version, when rendered.
    #[must_use]
    pub fn terraform_version(&self) -> Option<&str> {
        self.terraform_version.as_deref()
    }

    /// Returns resource changes in plan order.
    #[must_use]
    pub fn resource_changes(&self) -> &[ResourceChange] {
        &self.changes
    }

    /// Returns all input variable values.
    #[must_use]
    pub const fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    /// Returns an input variable value.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Returns a planned output change.
    #[must_use]
    pub fn output_change(&self, name: &str) -> Option<&OutputChange> {
        self.output_changes.get(name)
    }

    /// Returns the raw plan document.
    #[must_use]
    pub const fn document(&self) -> &Value {
        &self.document
    }

    /// Selects values from the raw plan document with a `JSONPath` expression.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidJsonPath`] when the expression is invalid.
    pub fn select(&self, path: &str) -> Result<Vec<&Value>, PlanError> {
        select(&self.document, path).map_err(|_| PlanError::InvalidJsonPath(path.to_string()))
    }

    /// Returns names declared in the plan's configuration block.
    ///
    /// Resource declarations include module calls, prefixed with their module
    /// path (`module.core.google_compute_network.ingress_vpc`).
    #[must_use]
    pub fn declared(&self, kind: DeclarationKind) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let Some(root) = self.document.get("configuration").and_then(|c| c.get("root_module"))
        else {
            return names;
        };
        match kind {
            DeclarationKind::Variable | DeclarationKind::Output => {
                let field = if kind == DeclarationKind::Variable { "variables" } else { "outputs" };
                if let Some(entries) = root.get(field).and_then(Value::as_object) {
                    names.extend(entries.keys().cloned());
                }
            }
            DeclarationKind::Resource => collect_declared_resources(root, "", &mut names),
        }
        names
    }
}

// ============================================================================
// SECTION: Raw Wire Types
// ============================================================================

/// Top-level plan document fields consumed by the decoder.
#[derive(Deserialize)]
struct RawPlan {
    /// Plan schema version.
    format_version: String,
    /// Engine version.
    #[serde(default)]
    terraform_version: Option<String>,
    /// Input variables.
    #[serde(default)]
    variables: BTreeMap<String, RawVariable>,
    /// Resource changes.
    #[serde(default)]
    resource_changes: Vec<RawResourceChange>,
    /// Root output changes.
    #[serde(default)]
    output_changes: BTreeMap<String, RawOutputChange>,
}

/// Input variable wrapper.
#[derive(Deserialize)]
struct RawVariable {
    /// Variable value.
    #[serde(default)]
    value: Value,
}

/// Resource change entry.
#[derive(Deserialize)]
struct RawResourceChange {
    /// Full address.
    address: String,
    /// Containing module address.
    #[serde(default)]
    module_address: Option<String>,
    /// Resource mode.
    #[serde(default)]
    mode: ResourceMode,
    /// Resource type.
    #[serde(rename = "type")]
    resource_type: String,
    /// Resource name.
    name: String,
    /// Instance index.
    #[serde(default)]
    index: Option<Value>,
    /// Deposed object key.
    #[serde(default)]
    deposed: Option<String>,
    /// Provider name.
    #[serde(default)]
    provider_name: Option<String>,
    /// Change detail.
    change: RawChange,
}

/// Change detail for a resource.
#[derive(Deserialize)]
struct RawChange {
    /// Action list.
    actions: Vec<String>,
    /// Prior state.
    #[serde(default)]
    before: Option<Value>,
    /// Planned state.
    #[serde(default)]
    after: Option<Value>,
    /// Unknown-after-apply markers.
    #[serde(default)]
    after_unknown: Option<Value>,
}

/// Change detail for an output.
#[derive(Deserialize)]
struct RawOutputChange {
    /// Action list.
    actions: Vec<String>,
    /// Planned value.
    #[serde(default)]
    after: Option<Value>,
    /// Unknown marker.
    #[serde(default)]
    after_unknown: Option<Value>,
    /// Sensitivity marker.
    #[serde(default)]
    after_sensitive: Option<Value>,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects plan documents outside the supported schema major.
fn check_format_version(version: &str) -> Result<(), PlanError> {
    let major = version.split('.').next().and_then(|major| major.parse::<u64>().ok());
    match major {
        Some(SUPPORTED_FORMAT_MAJOR) => Ok(()),
        _ => Err(PlanError::UnsupportedFormat {
            found: version.to_string(),
            expected: SUPPORTED_FORMAT_MAJOR,
        }),
    }
}

/// Splits an address on dots that are outside instance-key brackets.
fn split_address(raw: &str) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;
    for (pos, ch) in raw.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1).ok_or_else(|| "unbalanced ']'".to_string())?;
            }
            '.' if depth == 0 => {
                parts.push(&raw[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    if in_string || depth != 0 {
        return Err("unterminated instance key".to_string());
    }
    parts.push(&raw[start..]);
    if parts.iter().any(|part| part.is_empty()) {
        return Err("empty address segment".to_string());
    }
    Ok(parts)
}

/// Consumes leading `module.<name>` pairs and returns the next cursor.
fn take_module_steps(parts: &[&str]) -> Result<(Vec<ModuleStep>, usize), String> {
    let mut steps = Vec::new();
    let mut cursor = 0;
    while parts.get(cursor) == Some(&"module") {
        let Some(step) = parts.get(cursor + 1) else {
            return Err("module segment is missing its name".to_string());
        };
        let (name, key) = split_key(step)?;
        steps.push(ModuleStep {
            name: name.to_string(),
            key,
        });
        cursor += 2;
    }
    Ok((steps, cursor))
}

/// Parses a bare module address such as `module.core`.
fn parse_module_address(raw: &str) -> Result<Vec<ModuleStep>, String> {
    let parts = split_address(raw)?;
    let (steps, cursor) = take_module_steps(&parts)?;
    if steps.is_empty() || cursor != parts.len() {
        return Err(format!("invalid module address {raw}"));
    }
    Ok(steps)
}

/// Splits `name[key]` into its name and optional key.
fn split_key(segment: &str) -> Result<(&str, Option<InstanceKey>), String> {
    let Some(open) = segment.find('[') else {
        return Ok((segment, None));
    };
    let (name, rest) = segment.split_at(open);
    if name.is_empty() {
        return Err("instance key without a name".to_string());
    }
    let Some(inner) = rest.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) else {
        return Err(format!("malformed instance key in {segment}"));
    };
    Ok((name, Some(InstanceKey::parse_inner(inner)?)))
}

/// Removes quotes and escapes from a quoted instance key.
fn unquote(inner: &str) -> Result<String, String> {
    let Some(body) = inner.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) else {
        return Err(format!("unterminated string key {inner}"));
    };
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(next) => out.push(next),
                None => return Err("dangling escape in string key".to_string()),
            },
            '"' => return Err("unescaped quote in string key".to_string()),
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Escapes a string key for address rendering.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Qualifies a bare module name with the `module.` prefix.
pub(crate) fn normalize_module(module: &str) -> String {
    if module.starts_with("module.") { module.to_string() } else { format!("module.{module}") }
}

/// Collects declared resource addresses from a configuration module.
fn collect_declared_resources(module: &Value, prefix: &str, out: &mut BTreeSet<String>) {
    if let Some(resources) = module.get("resources").and_then(Value::as_array) {
        for resource in resources {
            if let Some(address) = resource.get("address").and_then(Value::as_str) {
                out.insert(format!("{prefix}{address}"));
            }
        }
    }
    if let Some(calls) = module.get("module_calls").and_then(Value::as_object) {
        for (name, call) in calls {
            if let Some(inner) = call.get("module") {
                collect_declared_resources(inner, &format!("{prefix}module.{name}."), out);
            }
        }
    }
}
