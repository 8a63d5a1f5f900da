//! Diff computation for resources
//!
//! Attribute changes are computed on the textual projection of a resource.
//! Where a resource names a [`SemanticEquality`] for an attribute, spellings
//! the comparator considers equivalent are not reported as drift.

use crate::remote::RemoteClient;
use crate::resource::Resource;
use crate::semantic::{ComparisonError, SemanticEquality};
use crate::types::ResourceState;
use crate::value::{Attributes, Value};
use anyhow::Result;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
    /// Desired value is only known after apply
    KnownAfterApply,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    pub name: String,
    pub old: Value<String>,
    pub new: Value<String>,
    pub kind: ChangeKind,
}

/// Compare desired attributes against current ones
///
/// Attributes present only in `current` are ignored: they are either
/// computed remotely or belong to settings this configuration leaves alone.
pub fn diff_attributes<'r>(
    current: &Attributes,
    desired: &Attributes,
    comparator: impl Fn(&str) -> Option<&'r dyn SemanticEquality>,
) -> Result<Vec<AttributeChange>, ComparisonError> {
    let mut changes = Vec::new();
    for (name, new) in desired.iter() {
        let old = current.get(name).cloned().unwrap_or_default();
        let kind = match (&old, new) {
            (_, Value::Unknown) => Some(ChangeKind::KnownAfterApply),
            (Value::Null, Value::Null) => None,
            (Value::Null | Value::Unknown, Value::Known(_)) => Some(ChangeKind::Added),
            (Value::Known(_) | Value::Unknown, Value::Null) => Some(ChangeKind::Removed),
            (Value::Known(a), Value::Known(b)) if a == b => None,
            (Value::Known(a), Value::Known(b)) => match comparator(name) {
                Some(cmp) if cmp.compare(a, b)? => {
                    log::debug!("Ignoring equivalent spelling of {name}: {a:?} vs {b:?}");
                    None
                }
                _ => Some(ChangeKind::Modified),
            },
        };
        if let Some(kind) = kind {
            changes.push(AttributeChange {
                name: name.to_string(),
                old,
                new: new.clone(),
                kind,
            });
        }
    }
    Ok(changes)
}

/// A planned change to one resource
#[derive(Debug, Clone)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    pub action: Action,
    pub changes: Vec<AttributeChange>,
}

impl ResourceDiff {
    /// Diff a resource against a known current state, `None` if in sync
    pub fn compute(
        resource: &dyn Resource,
        current: &ResourceState,
    ) -> Result<Option<Self>, ComparisonError> {
        let desired = resource.desired_state();
        let (action, changes) = match (current, &desired) {
            (ResourceState::Absent, ResourceState::Absent) => return Ok(None),
            (ResourceState::Absent, ResourceState::Present(attrs)) => (
                Action::Create,
                diff_attributes(&Attributes::new(), attrs, |_| None)?,
            ),
            (ResourceState::Present(attrs), ResourceState::Absent) => (
                Action::Delete,
                attrs
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(name, old)| AttributeChange {
                        name: name.to_string(),
                        old: old.clone(),
                        new: Value::Null,
                        kind: ChangeKind::Removed,
                    })
                    .collect(),
            ),
            (ResourceState::Present(current), ResourceState::Present(desired)) => {
                let changes = diff_attributes(current, desired, |name| resource.comparator(name))?;
                if changes.is_empty() {
                    return Ok(None);
                }
                (Action::Update, changes)
            }
        };

        Ok(Some(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            action,
            changes,
        }))
    }

    /// Read the current state and diff against it
    pub fn from_resource(resource: &dyn Resource, remote: &dyn RemoteClient) -> Result<Option<Self>> {
        let current = resource.current_state(remote)?;
        Ok(Self::compute(resource, &current)?)
    }

    pub fn is_addition(&self) -> bool {
        self.action == Action::Create
    }

    pub fn is_removal(&self) -> bool {
        self.action == Action::Delete
    }

    pub fn is_modification(&self) -> bool {
        self.action == Action::Update
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
    /// Number of attributes only known after apply
    pub deferred: usize,
}

impl DiffSummary {
    pub fn from_diffs<'a>(diffs: impl IntoIterator<Item = &'a ResourceDiff>) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.additions += 1,
                Action::Delete => summary.removals += 1,
                Action::Update => summary.modifications += 1,
            }
            summary.deferred += diff
                .changes
                .iter()
                .filter(|c| c.kind == ChangeKind::KnownAfterApply)
                .count();
        }
        summary
    }

    /// Total number of changes
    pub const fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub const fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type<'a>(
    diffs: impl IntoIterator<Item = &'a ResourceDiff>,
) -> HashMap<String, Vec<&'a ResourceDiff>> {
    let mut groups: HashMap<String, Vec<&ResourceDiff>> = HashMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
