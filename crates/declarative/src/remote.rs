//! Remote entity store
//!
//! A [`RemoteClient`] is the narrow surface the reconciler needs from an API:
//! fetch, replace, and delete whole entity records. Child resources that the
//! API only exposes as part of a parent (DNS records in a zone, hostnames on
//! a pull zone) are addressed with [`Location::Nested`] and written by
//! read-modify-write of the parent record. Callers must hold the parent's
//! lock around those writes or concurrent updates overwrite each other.

use crate::error::Error;
use crate::lock::lock_recover;
use crate::value::Record;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

pub trait RemoteClient: Send + Sync {
    fn get(&self, kind: &str, id: &str) -> Result<Option<Record>>;

    fn put(&self, kind: &str, id: &str, record: Record) -> Result<()>;

    /// Returns whether the entity existed
    fn delete(&self, kind: &str, id: &str) -> Result<bool>;
}

/// Where a resource's attributes live on the remote
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "location", rename_all = "snake_case")]
pub enum Location {
    /// A standalone entity
    Entity { kind: String, id: String },
    /// An item of a collection stored inside a parent entity
    Nested {
        kind: String,
        id: String,
        collection: String,
        key: String,
    },
}

impl Location {
    pub fn entity(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Entity {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn nested(
        kind: impl Into<String>,
        id: impl Into<String>,
        collection: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self::Nested {
            kind: kind.into(),
            id: id.into(),
            collection: collection.into(),
            key: key.into(),
        }
    }

    pub const fn is_nested(&self) -> bool {
        matches!(self, Self::Nested { .. })
    }

    /// Read the resource's own attributes
    pub fn read(&self, remote: &dyn RemoteClient) -> Result<Option<Record>> {
        match self {
            Self::Entity { kind, id } => Ok(remote.get(kind, id)?.map(|r| own_attributes(&r))),
            Self::Nested {
                kind,
                id,
                collection,
                key,
            } => {
                let Some(parent) = remote.get(kind, id)? else {
                    return Ok(None);
                };
                let prefix = item_prefix(collection, key);
                let item: Record = parent
                    .iter()
                    .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|a| (a.to_string(), v.clone())))
                    .collect();
                Ok((!item.is_empty()).then_some(item))
            }
        }
    }

    /// Store `record`, or remove the resource when `record` is `None`
    ///
    /// Entity writes keep the nested collections of the existing record.
    pub fn write(&self, remote: &dyn RemoteClient, record: Option<Record>) -> Result<()> {
        match self {
            Self::Entity { kind, id } => match record {
                None => {
                    remote.delete(kind, id)?;
                    Ok(())
                }
                Some(mut record) => {
                    if let Some(existing) = remote.get(kind, id)? {
                        record.extend(existing.into_iter().filter(|(k, _)| is_item_key(k)));
                    }
                    remote.put(kind, id, record)
                }
            },
            Self::Nested {
                kind,
                id,
                collection,
                key,
            } => {
                let prefix = item_prefix(collection, key);
                let Some(mut parent) = remote.get(kind, id)? else {
                    if record.is_none() {
                        return Ok(());
                    }
                    return Err(Error::ParentMissing {
                        kind: kind.clone(),
                        id: id.clone(),
                        collection: collection.clone(),
                    }
                    .into());
                };
                parent.retain(|k, _| !k.starts_with(&prefix));
                if let Some(record) = record {
                    parent.extend(record.into_iter().map(|(k, v)| (format!("{prefix}{k}"), v)));
                }
                remote.put(kind, id, parent)
            }
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity { kind, id } => write!(f, "{kind}/{id}"),
            Self::Nested {
                kind,
                id,
                collection,
                key,
            } => write!(f, "{kind}/{id}/{collection}[{key}]"),
        }
    }
}

/// Record key prefix for one collection item: `records[www].`
fn item_prefix(collection: &str, key: &str) -> String {
    format!("{collection}[{key}].")
}

fn is_item_key(key: &str) -> bool {
    key.contains('[')
}

fn own_attributes(record: &Record) -> Record {
    record
        .iter()
        .filter(|(k, _)| !is_item_key(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// In-memory [`RemoteClient`] for tests and offline runs
#[derive(Debug, Default)]
pub struct MemoryRemote {
    entities: Mutex<BTreeMap<(String, String), Record>>,
    latency: Duration,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep between reading and returning on every `get`, to widen race windows
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn len(&self) -> usize {
        lock_recover(&self.entities).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RemoteClient for MemoryRemote {
    fn get(&self, kind: &str, id: &str) -> Result<Option<Record>> {
        let record = lock_recover(&self.entities)
            .get(&(kind.to_string(), id.to_string()))
            .cloned();
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        Ok(record)
    }

    fn put(&self, kind: &str, id: &str, record: Record) -> Result<()> {
        lock_recover(&self.entities).insert((kind.to_string(), id.to_string()), record);
        Ok(())
    }

    fn delete(&self, kind: &str, id: &str) -> Result<bool> {
        Ok(lock_recover(&self.entities)
            .remove(&(kind.to_string(), id.to_string()))
            .is_some())
    }
}
