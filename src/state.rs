use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::{ApplyResult, EntityKey, Location, Outcome};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// File name of the managed-resource state inside the state directory
pub const STATE_FILE: &str = "state.toml";

// ============================================================================
// State Structures
// ============================================================================

/// Resources bunnyform has created or adopted
///
/// A resource that is in the state but no longer in the configuration is
/// planned for deletion.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderState {
    /// Managed resources by address (`type.name`)
    #[serde(default)]
    pub resources: BTreeMap<String, ManagedResource>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

/// Enough about a managed resource to delete it without its configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ManagedResource {
    pub resource_type: String,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_key: Option<EntityKey>,
}

/// Address of a resource's previous location once it has moved
pub fn displaced_id(id: &str, location: &Location) -> String {
    format!("{id}@{location}")
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            resources: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

// ============================================================================
// ProviderState Implementation
// ============================================================================

impl ProviderState {
    /// Get the state file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(paths::state_dir()?.join(STATE_FILE))
    }

    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Update the last_updated timestamp and save
    pub fn touch(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();
        self.save(path)
    }

    /// Fold apply outcomes into the state
    ///
    /// `known` describes every configured resource. Created and modified
    /// resources become managed, removed ones are forgotten, and anything
    /// that failed keeps its previous entry.
    pub fn record_outcomes<'a>(
        &mut self,
        outcomes: impl IntoIterator<Item = &'a Outcome>,
        known: &BTreeMap<String, ManagedResource>,
    ) {
        for outcome in outcomes {
            match &outcome.result {
                ApplyResult::Created | ApplyResult::Modified | ApplyResult::NoChange => {
                    if let Some(managed) = known.get(&outcome.resource_id) {
                        self.resources
                            .insert(outcome.resource_id.clone(), managed.clone());
                    }
                }
                ApplyResult::Removed => {
                    self.resources.remove(&outcome.resource_id);
                }
                ApplyResult::Invalid { .. }
                | ApplyResult::Failed { .. }
                | ApplyResult::Skipped { .. } => {}
            }
        }
    }

    /// Re-key moved resources whose old location was part of this apply
    ///
    /// The previous location stays managed under its [`displaced_id`] until
    /// its deletion succeeds. Call before [`Self::record_outcomes`].
    pub fn retire_moved<'a>(&mut self, outcomes: impl IntoIterator<Item = &'a Outcome>) {
        let planned: BTreeSet<&str> = outcomes
            .into_iter()
            .map(|o| o.resource_id.as_str())
            .collect();
        let moved: Vec<String> = self
            .resources
            .iter()
            .filter(|(id, managed)| planned.contains(displaced_id(id, &managed.location).as_str()))
            .map(|(id, _)| id.clone())
            .collect();
        for id in moved {
            if let Some(managed) = self.resources.remove(&id) {
                log::debug!("{id} left {}", managed.location);
                self.resources
                    .insert(displaced_id(&id, &managed.location), managed);
            }
        }
    }

    /// Adopt configured resources the remote already matches
    pub fn adopt<'a>(
        &mut self,
        ids: impl IntoIterator<Item = &'a String>,
        known: &BTreeMap<String, ManagedResource>,
    ) {
        for id in ids {
            if let Some(managed) = known.get(id) {
                self.resources.insert(id.clone(), managed.clone());
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn zone() -> ManagedResource {
        ManagedResource {
            resource_type: "dns_zone".into(),
            location: Location::entity("dns_zone", "example.com"),
            lock_key: Some(EntityKey::Name("dns_zone/example.com".into())),
        }
    }

    fn record() -> ManagedResource {
        ManagedResource {
            resource_type: "dns_record".into(),
            location: Location::nested("dns_zone", "example.com", "records", "www"),
            lock_key: Some(EntityKey::Name("dns_zone/example.com".into())),
        }
    }

    fn outcome(id: &str, result: ApplyResult) -> Outcome {
        Outcome {
            resource_id: id.to_string(),
            result,
        }
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let state = ProviderState::load(&dir.path().join(STATE_FILE)).unwrap();
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join(STATE_FILE);

        let mut state = ProviderState::default();
        state.resources.insert("dns_zone.main".into(), zone());
        state.resources.insert("dns_record.www".into(), record());
        state.touch(&path).unwrap();

        let loaded = ProviderState::load(&path).unwrap();
        assert_eq!(loaded.resources, state.resources);
    }

    #[test]
    fn test_record_outcomes() {
        let known = BTreeMap::from([
            ("dns_zone.main".to_string(), zone()),
            ("dns_record.www".to_string(), record()),
        ]);
        let mut state = ProviderState::default();
        state.resources.insert("dns_record.old".into(), record());
        state.resources.insert("dns_record.broken".into(), record());

        state.record_outcomes(
            &[
                outcome("dns_zone.main", ApplyResult::Created),
                outcome(
                    "dns_record.www",
                    ApplyResult::Failed {
                        error: "boom".into(),
                    },
                ),
                outcome("dns_record.old", ApplyResult::Removed),
                outcome(
                    "dns_record.broken",
                    ApplyResult::Failed {
                        error: "boom".into(),
                    },
                ),
            ],
            &known,
        );

        let ids: Vec<&str> = state.resources.keys().map(String::as_str).collect();
        assert_eq!(ids, ["dns_record.broken", "dns_zone.main"]);
    }

    #[test]
    fn test_moved_location_tracked_until_removed() {
        let old = displaced_id("dns_record.www", &record().location);
        assert_eq!(old, "dns_record.www@dns_zone/example.com/records[www]");

        let moved = ManagedResource {
            location: Location::nested("dns_zone", "example.org", "records", "www"),
            lock_key: Some(EntityKey::Name("dns_zone/example.org".into())),
            ..record()
        };
        let known = BTreeMap::from([("dns_record.www".to_string(), moved.clone())]);

        // The new location was written but deleting the old one failed
        let mut state = ProviderState::default();
        state.resources.insert("dns_record.www".into(), record());
        let outcomes = [
            outcome("dns_record.www", ApplyResult::Created),
            outcome(
                &old,
                ApplyResult::Failed {
                    error: "boom".into(),
                },
            ),
        ];
        state.retire_moved(&outcomes);
        state.record_outcomes(&outcomes, &known);
        assert_eq!(state.resources["dns_record.www"], moved);
        assert_eq!(state.resources[&old], record());

        // The retry removes it
        let outcomes = [outcome(&old, ApplyResult::Removed)];
        state.retire_moved(&outcomes);
        state.record_outcomes(&outcomes, &known);
        assert_eq!(state.resources.len(), 1);
        assert_eq!(state.resources["dns_record.www"], moved);
    }

    #[test]
    fn test_adopt_records_configured_location() {
        let known = BTreeMap::from([("dns_zone.main".to_string(), zone())]);
        let mut state = ProviderState::default();
        state.resources.insert(
            "dns_zone.main".into(),
            ManagedResource {
                location: Location::entity("dns_zone", "example.org"),
                ..zone()
            },
        );
        state.adopt(&["dns_zone.main".to_string(), "pullzone.gone".to_string()], &known);
        assert_eq!(state.resources.len(), 1);
        assert_eq!(state.resources["dns_zone.main"], zone());
    }
}
