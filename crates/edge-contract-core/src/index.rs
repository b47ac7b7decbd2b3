// crates/edge-contract-core/src/index.rs
// ============================================================================
// Module: Plan Indexer
// Description: Address and (type, name) lookup over planned resource changes.
// Purpose: Give assertions O(1) access to changes without conflating modules.
// Dependencies: crate::plan, serde, thiserror
// ============================================================================

//! ## Overview
//! [`PlanIndex`] owns an [`ExecutionPlan`] and maps every full resource
//! address to its change. A secondary `(type, name)` map returns every
//! address sharing that pair across modules, so `proxy_only_subnet` in
//! `module.core` and in `module.demo-web-app` are reported separately.
//! Query helpers return results sorted by address; consumers must not rely on
//! the internal map order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::plan::Action;
use crate::plan::ExecutionPlan;
use crate::plan::PlanError;
use crate::plan::ResourceChange;
use crate::plan::normalize_module;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lookup failures for single-resource queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No change matches the query.
    #[error("resource {0} not found in plan")]
    NotFound(String),
    /// More than one module declares the queried resource.
    #[error("resource {query} is ambiguous across modules: {}", .addresses.join(", "))]
    Ambiguous {
        /// Query text.
        query: String,
        /// Matching addresses.
        addresses: Vec<String>,
    },
}

/// Module-qualified resource identity without an instance key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceKey {
    /// Module address, or `None` for the root module.
    pub module: Option<String>,
    /// Resource type.
    pub resource_type: String,
    /// Resource name.
    pub name: String,
}

impl ResourceKey {
    /// Builds a key, qualifying bare module names with `module.`.
    #[must_use]
    pub fn new(module: Option<&str>, resource_type: &str, name: &str) -> Self {
        Self {
            module: module.map(normalize_module),
            resource_type: resource_type.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(module) = &self.module {
            write!(f, "{module}.")?;
        }
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Indexed, read-only view of a plan.
#[derive(Debug, Clone)]
pub struct PlanIndex {
    /// Indexed plan.
    plan: ExecutionPlan,
    /// Address to change position.
    by_address: HashMap<String, usize>,
    /// `(type, name)` to change positions.
    by_type_name: HashMap<(String, String), Vec<usize>>,
}

impl PlanIndex {
    /// Builds the index.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Decode`] when two changes share an address.
    pub fn build(plan: ExecutionPlan) -> Result<Self, PlanError> {
        let mut by_address = HashMap::with_capacity(plan.resource_changes().len());
        let mut by_type_name: HashMap<(String, String), Vec<usize>> = HashMap::new();
        for (position, change) in plan.resource_changes().iter().enumerate() {
            let key = match &change.deposed {
                Some(deposed) => format!("{} (deposed {deposed})", change.address),
                None => change.address.clone(),
            };
            if by_address.insert(key, position).is_some() {
                return Err(PlanError::Decode(format!(
                    "duplicate resource address {}",
                    change.address
                )));
            }
            by_type_name
                .entry((change.resource_type().to_string(), change.name().to_string()))
                .or_default()
                .push(position);
        }
        Ok(Self {
            plan,
            by_address,
            by_type_name,
        })
    }

    /// Decodes and indexes plan JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when decoding or indexing fails.
    pub fn from_json_str(text: &str) -> Result<Self, PlanError> {
        Self::build(ExecutionPlan::from_json_str(text)?)
    }

    /// Returns the indexed plan.
    #[must_use]
    pub const fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// Returns the number of indexed changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plan.resource_changes().len()
    }

    /// Returns true when the plan has no resource changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plan.resource_changes().is_empty()
    }

    /// Iterates changes. Order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceChange> {
        self.plan.resource_changes().iter()
    }

    /// Returns the change at a full address.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<&ResourceChange> {
        self.by_address.get(address).and_then(|position| self.at(*position))
    }

    /// Returns every change with the given type and name across all modules,
    /// sorted by address.
    #[must_use]
    pub fn find(&self, resource_type: &str, name: &str) -> Vec<&ResourceChange> {
        let Some(positions) =
            self.by_type_name.get(&(resource_type.to_string(), name.to_string()))
        else {
            return Vec::new();
        };
        let mut changes: Vec<&ResourceChange> =
            positions.iter().filter_map(|position| self.at(*position)).collect();
        changes.sort_by(|left, right| left.address.cmp(&right.address));
        changes
    }

    /// Returns the changes for a type and name inside one module.
    ///
    /// `None` selects the root module.
    #[must_use]
    pub fn find_in_module(
        &self,
        module: Option<&str>,
        resource_type: &str,
        name: &str,
    ) -> Vec<&ResourceChange> {
        self.find(resource_type, name)
            .into_iter()
            .filter(|change| change.identity.in_module(module))
            .collect()
    }

    /// Returns the single resource (any instance key) with a type and name.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] when absent and
    /// [`LookupError::Ambiguous`] when several modules declare it.
    pub fn find_unique(
        &self,
        resource_type: &str,
        name: &str,
    ) -> Result<&ResourceChange, LookupError> {
        let changes = self.find(resource_type, name);
        let modules: BTreeSet<Option<String>> =
            changes.iter().map(|change| change.identity.module_address()).collect();
        if modules.len() > 1 {
            return Err(LookupError::Ambiguous {
                query: format!("{resource_type}.{name}"),
                addresses: changes.iter().map(|change| change.address.clone()).collect(),
            });
        }
        changes
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::NotFound(format!("{resource_type}.{name}")))
    }

    /// Returns true when a change with the type and name exists in any module
    /// and is not a delete.
    #[must_use]
    pub fn contains(&self, resource_type: &str, name: &str) -> bool {
        self.find(resource_type, name).iter().any(|change| change.planned_to_exist())
    }

    /// Returns every change of a type, sorted by address.
    #[must_use]
    pub fn of_type(&self, resource_type: &str) -> Vec<&ResourceChange> {
        let mut changes: Vec<&ResourceChange> =
            self.iter().filter(|change| change.resource_type() == resource_type).collect();
        changes.sort_by(|left, right| left.address.cmp(&right.address));
        changes
    }

    /// Returns the addresses of every change of a type, sorted.
    #[must_use]
    pub fn addresses_of_type(&self, resource_type: &str) -> Vec<&str> {
        self.of_type(resource_type).into_iter().map(|change| change.address.as_str()).collect()
    }

    /// Returns the distinct resource types in the plan.
    #[must_use]
    pub fn resource_types(&self) -> BTreeSet<&str> {
        self.iter().map(ResourceChange::resource_type).collect()
    }

    /// Returns keys of resources that exist after apply.
    #[must_use]
    pub fn resource_keys(&self) -> BTreeSet<ResourceKey> {
        self.iter()
            .filter(|change| change.planned_to_exist())
            .map(|change| ResourceKey {
                module: change.identity.module_address(),
                resource_type: change.resource_type().to_string(),
                name: change.name().to_string(),
            })
            .collect()
    }

    /// Returns true when nothing but no-ops and data reads are planned.
    #[must_use]
    pub fn is_empty_diff(&self) -> bool {
        self.iter().all(|change| !change.action.is_change())
    }

    /// Returns the changes that would modify infrastructure, sorted by address.
    #[must_use]
    pub fn pending_changes(&self) -> Vec<&ResourceChange> {
        let mut changes: Vec<&ResourceChange> =
            self.iter().filter(|change| change.action.is_change()).collect();
        changes.sort_by(|left, right| left.address.cmp(&right.address));
        changes
    }

    /// Counts planned actions.
    #[must_use]
    pub fn action_counts(&self) -> ActionCounts {
        let mut counts = ActionCounts::default();
        for change in self.iter() {
            match change.action {
                Action::Create => counts.create += 1,
                Action::Update => counts.update += 1,
                Action::Delete => counts.delete += 1,
                Action::Replace => counts.replace += 1,
                Action::Forget => counts.forget += 1,
                Action::NoOp | Action::Read => counts.unchanged += 1,
            }
        }
        counts
    }

    /// Returns the change at a position.
    fn at(&self, position: usize) -> Option<&ResourceChange> {
        self.plan.resource_changes().get(position)
    }
}

/// Planned action tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionCounts {
    /// Resources to create.
    pub create: usize,
    /// Resources to update in place.
    pub update: usize,
    /// Resources to delete.
    pub delete: usize,
    /// Resources to replace.
    pub replace: usize,
    /// Resources dropped from state but left in place.
    pub forget: usize,
    /// Unchanged resources and data reads.
    pub unchanged: usize,
}
