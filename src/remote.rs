//! Offline remote backed by a JSON file
//!
//! Stands in for the bunny.net HTTP API: every entity is a flat record keyed
//! by kind and id. Writes are flushed to disk before they return, so a
//! crashed apply leaves the file consistent with what was reported.

use anyhow::{Context, Result};
use declarative::{Record, RemoteClient};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::paths;

/// File name of the offline store inside the state directory
pub const REMOTE_FILE: &str = "remote.json";

type Entities = BTreeMap<String, BTreeMap<String, Record>>;

#[derive(Debug)]
pub struct FileRemote {
    path: PathBuf,
    entities: Mutex<Entities>,
}

impl FileRemote {
    /// Open the store in the state directory
    pub fn open_default() -> Result<Self> {
        Self::open(&paths::state_dir()?.join(REMOTE_FILE))
    }

    /// Open a store, starting empty if the file does not exist yet
    pub fn open(path: &Path) -> Result<Self> {
        let entities = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read remote store: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse remote store: {}", path.display()))?
        } else {
            log::debug!("Remote store {} does not exist, starting empty", path.display());
            Entities::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            entities: Mutex::new(entities),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ids of every stored entity of `kind`
    pub fn ids(&self, kind: &str) -> Vec<String> {
        self.entities()
            .get(kind)
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn entities(&self) -> MutexGuard<'_, Entities> {
        self.entities.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush(&self, entities: &Entities) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        let content =
            serde_json::to_string_pretty(entities).context("Failed to serialize remote store")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write remote store: {}", self.path.display()))
    }
}

impl RemoteClient for FileRemote {
    fn get(&self, kind: &str, id: &str) -> Result<Option<Record>> {
        Ok(self.entities().get(kind).and_then(|e| e.get(id)).cloned())
    }

    fn put(&self, kind: &str, id: &str, record: Record) -> Result<()> {
        let mut entities = self.entities();
        entities
            .entry(kind.to_string())
            .or_default()
            .insert(id.to_string(), record);
        log::trace!("Stored {kind}/{id}");
        self.flush(&entities)
    }

    fn delete(&self, kind: &str, id: &str) -> Result<bool> {
        let mut entities = self.entities();
        let Some(of_kind) = entities.get_mut(kind) else {
            return Ok(false);
        };
        let removed = of_kind.remove(id).is_some();
        if of_kind.is_empty() {
            entities.remove(kind);
        }
        if removed {
            log::trace!("Deleted {kind}/{id}");
            self.flush(&entities)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Location;
    use tempfile::TempDir;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_writes_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(REMOTE_FILE);

        let remote = FileRemote::open(&path).unwrap();
        remote
            .put("dns_zone", "example.com", record(&[("domain", "example.com")]))
            .unwrap();
        Location::nested("dns_zone", "example.com", "records", "www")
            .write(&remote, Some(record(&[("type", "2"), ("value", "cdn.example.net")])))
            .unwrap();

        let reopened = FileRemote::open(&path).unwrap();
        assert_eq!(reopened.ids("dns_zone"), ["example.com"]);
        let www = Location::nested("dns_zone", "example.com", "records", "www")
            .read(&reopened)
            .unwrap()
            .unwrap();
        assert_eq!(www["value"], "cdn.example.net");
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let remote = FileRemote::open(&dir.path().join(REMOTE_FILE)).unwrap();
        assert!(!remote.delete("pullzone", "cdn").unwrap());

        remote.put("pullzone", "cdn", record(&[("name", "cdn")])).unwrap();
        assert!(remote.delete("pullzone", "cdn").unwrap());
        assert!(remote.get("pullzone", "cdn").unwrap().is_none());
        assert!(remote.ids("pullzone").is_empty());
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(REMOTE_FILE);
        fs::write(&path, "not json").unwrap();
        let err = FileRemote::open(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse remote store"));
    }
}
