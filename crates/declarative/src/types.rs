//! Core types for reconciliation

use crate::constraint::Violation;
use crate::value::Attributes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Current or desired state of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceState {
    /// Resource exists with these attributes
    Present(Attributes),
    /// Resource does not exist
    Absent,
}

impl ResourceState {
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub const fn attributes(&self) -> Option<&Attributes> {
        match self {
            Self::Present(attrs) => Some(attrs),
            Self::Absent => None,
        }
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was removed
    Removed,
    /// Configuration broke one or more rules; nothing was sent
    Invalid { violations: Vec<Violation> },
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. } | Self::Invalid { .. })
    }

    /// Check if the result represents a change
    pub const fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }
}

/// Result of one resource, keyed by its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub resource_id: String,
    pub result: ApplyResult,
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub invalid: usize,
    pub failed: usize,
    pub no_change: usize,
    /// Per-resource results in completion order
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub const fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if execution was fully successful
    pub const fn is_success(&self) -> bool {
        self.failed == 0 && self.invalid == 0
    }

    /// Total number of resources processed
    pub const fn total(&self) -> usize {
        self.created
            + self.modified
            + self.removed
            + self.skipped
            + self.invalid
            + self.failed
            + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: Self) {
        self.created += other.created;
        self.modified += other.modified;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.invalid += other.invalid;
        self.failed += other.failed;
        self.no_change += other.no_change;
        self.outcomes.extend(other.outcomes);
    }

    /// Count a result without recording its outcome
    pub const fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Invalid { .. } => self.invalid += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }

    /// Count a result and keep it as an outcome
    pub fn record(&mut self, resource_id: String, result: ApplyResult) {
        self.add_result(&result);
        self.outcomes.push(Outcome {
            resource_id,
            result,
        });
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Verbose output
    pub verbose: bool,
    /// Give up on a contended entity lock after this long; wait forever if unset
    pub lock_timeout: Option<Duration>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            verbose: false,
            lock_timeout: None,
        }
    }
}
