//! Execution planner - diffs resources against the remote and stages changes

use crate::diff::{Action, DiffSummary, ResourceDiff};
use crate::remote::RemoteClient;
use crate::resource::{BoxedResource, Resource};
use rayon::prelude::*;

/// A resource paired with the change planned for it
#[derive(Debug)]
pub struct PlannedChange {
    pub resource: BoxedResource,
    pub diff: ResourceDiff,
}

/// A resource whose current state could not be read or compared
#[derive(Debug, Clone)]
pub struct PlanFailure {
    pub resource_id: String,
    pub error: String,
}

/// Order in which changes are applied
///
/// Parents are written before the items nested in them, and deleted only
/// after their items are gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Create or update standalone entities
    Entities,
    /// Any change to items stored inside a parent
    Nested,
    /// Delete standalone entities
    Teardown,
}

impl Stage {
    pub const ALL: [Self; 3] = [Self::Entities, Self::Nested, Self::Teardown];

    pub fn of(change: &PlannedChange) -> Self {
        if change.resource.location().is_nested() {
            Self::Nested
        } else if change.diff.action == Action::Delete {
            Self::Teardown
        } else {
            Self::Entities
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Entities => "entities",
            Self::Nested => "nested items",
            Self::Teardown => "teardown",
        }
    }
}

/// The changes needed to converge the remote
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    pub changes: Vec<PlannedChange>,
    /// Ids of resources already in the desired state
    pub unchanged: Vec<String>,
    pub failures: Vec<PlanFailure>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every resource's current state and diff it
    ///
    /// Reads run in parallel on the global rayon pool. A resource that fails
    /// to read ends up in `failures` without affecting the others.
    pub fn build(resources: Vec<BoxedResource>, remote: &dyn RemoteClient) -> Self {
        let diffs: Vec<_> = resources
            .into_par_iter()
            .map(|resource| {
                let diff = ResourceDiff::from_resource(resource.as_ref(), remote);
                (resource, diff)
            })
            .collect();

        let mut plan = Self::new();
        for (resource, diff) in diffs {
            match diff {
                Ok(Some(diff)) => plan.changes.push(PlannedChange { resource, diff }),
                Ok(None) => plan.unchanged.push(resource.id()),
                Err(e) => {
                    log::warn!("Could not plan {}: {e:#}", resource.id());
                    plan.failures.push(PlanFailure {
                        resource_id: resource.id(),
                        error: format!("{e:#}"),
                    });
                }
            }
        }
        log::debug!(
            "Planned {} changes, {} unchanged, {} failed",
            plan.changes.len(),
            plan.unchanged.len(),
            plan.failures.len()
        );
        plan
    }

    /// Filter plan to only include resources matching a predicate
    #[must_use]
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            changes: self
                .changes
                .into_iter()
                .filter(|c| predicate(c.resource.as_ref()))
                .collect(),
            unchanged: self.unchanged,
            failures: self.failures,
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    #[must_use]
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => self.filter(|r| matches_target(r, t)),
        }
    }

    /// Changes applied in `stage`
    pub fn stage(&self, stage: Stage) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(move |c| Stage::of(c) == stage)
    }

    pub fn diffs(&self) -> impl Iterator<Item = &ResourceDiff> {
        self.changes.iter().map(|c| &c.diff)
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_diffs(self.diffs())
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.changes.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((resource_type, name)) => (Some(resource_type.to_string()), Some(name.to_string())),
    }
}

/// Whether `resource` is selected by a "type" or "type.name" target
pub fn matches_target(resource: &dyn Resource, target: &str) -> bool {
    let (resource_type, name) = parse_target(target);
    matches_filter(resource, resource_type.as_deref(), name.as_deref())
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, resource_type: Option<&str>, name: Option<&str>) -> bool {
    if let Some(rt) = resource_type {
        // Allow common aliases
        let matches_type = match rt {
            "dns" => resource.resource_type().starts_with("dns_"),
            "cdn" => resource.resource_type().starts_with("pullzone"),
            _ => resource.resource_type() == rt,
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && resource.id() != format!("{}.{n}", resource.resource_type())
    {
        return false;
    }

    true
}
