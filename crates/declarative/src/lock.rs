//! Keyed mutual exclusion
//!
//! A [`LockTable`] hands out one exclusive lock per key. Entries are created
//! on first use and dropped once nobody holds or waits on them, so the table
//! only grows with the number of keys currently in contention. Callers
//! working on distinct keys never wait on each other beyond the short
//! bookkeeping section that looks the key up.
//!
//! Locks are not reentrant: locking a key already held by the current thread
//! deadlocks, exactly like [`std::sync::Mutex`].
//!
//! ```
//! use declarative::{EntityKey, LockTable};
//!
//! let locks = LockTable::new();
//! {
//!     let _zone = locks.lock(EntityKey::Id(42));
//!     // read-modify-write zone 42
//! }
//! assert_eq!(locks.tracked_keys(), 0);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Identity of a remote entity whose mutations must be serialized
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityKey {
    /// Numeric remote id
    Id(i64),
    /// Name-based identity, used before an id is assigned
    Name(String),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

impl From<i64> for EntityKey {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for EntityKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Bounds every lock key has to satisfy
pub trait LockKey: Eq + Hash + Clone + fmt::Display + Send + Sync {}

impl<K: Eq + Hash + Clone + fmt::Display + Send + Sync> LockKey for K {}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("gave up waiting for the lock on {key} after {waited:?}")]
    Timeout { key: String, waited: Duration },
}

/// Acquire a std mutex, recovering the data if a previous holder panicked
///
/// Every critical section in this module leaves the protected data
/// consistent before it can panic, so the poison flag carries no information.
pub(crate) fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Slot {
    held: Mutex<bool>,
    released: Condvar,
}

#[derive(Debug)]
struct Entry {
    slot: Arc<Slot>,
    /// Holders plus waiters
    refs: usize,
}

/// Table of per-key exclusive locks
///
/// Constructed by the caller and shared by reference, so independent
/// reconcilers (and tests) never contend on the same table.
pub struct LockTable<K: LockKey = EntityKey> {
    entries: Mutex<HashMap<K, Entry>>,
}

impl<K: LockKey> Default for LockTable<K> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: LockKey> fmt::Debug for LockTable<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockTable")
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}

impl<K: LockKey> LockTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock on `key` is acquired
    pub fn lock(&self, key: K) -> KeyGuard<'_, K> {
        let slot = self.checkout(&key);
        {
            let mut held = lock_recover(&slot.held);
            while *held {
                held = slot
                    .released
                    .wait(held)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            *held = true;
        }
        log::trace!("Locked {key}");
        KeyGuard {
            table: self,
            key,
            slot,
        }
    }

    /// Like [`LockTable::lock`], but give up after `timeout`
    ///
    /// A caller that gives up no longer counts toward the entry, so abandoned
    /// waits never keep a key alive.
    pub fn lock_timeout(&self, key: K, timeout: Duration) -> Result<KeyGuard<'_, K>, LockError> {
        let start = Instant::now();
        let slot = self.checkout(&key);
        {
            let mut held = lock_recover(&slot.held);
            while *held {
                let Some(remaining) = timeout.checked_sub(start.elapsed()) else {
                    drop(held);
                    self.checkin(&key);
                    log::debug!("Timed out waiting for lock on {key}");
                    return Err(LockError::Timeout {
                        key: key.to_string(),
                        waited: start.elapsed(),
                    });
                };
                held = slot
                    .released
                    .wait_timeout(held, remaining)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            }
            *held = true;
        }
        log::trace!("Locked {key} after {:?}", start.elapsed());
        Ok(KeyGuard {
            table: self,
            key,
            slot,
        })
    }

    /// Acquire the lock only if nobody holds it right now
    pub fn try_lock(&self, key: K) -> Option<KeyGuard<'_, K>> {
        let slot = self.checkout(&key);
        let acquired = {
            let mut held = lock_recover(&slot.held);
            if *held {
                false
            } else {
                *held = true;
                true
            }
        };
        if acquired {
            Some(KeyGuard {
                table: self,
                key,
                slot,
            })
        } else {
            self.checkin(&key);
            None
        }
    }

    /// Run `f` while holding the lock on `key`
    ///
    /// The lock is released on every exit path, including unwinding.
    pub fn with_lock<T>(&self, key: K, f: impl FnOnce() -> T) -> T {
        let _guard = self.lock(key);
        f()
    }

    /// Number of keys currently held or waited on
    pub fn tracked_keys(&self) -> usize {
        lock_recover(&self.entries).len()
    }

    fn checkout(&self, key: &K) -> Arc<Slot> {
        let mut entries = lock_recover(&self.entries);
        let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
            slot: Arc::default(),
            refs: 0,
        });
        entry.refs += 1;
        Arc::clone(&entry.slot)
    }

    fn checkin(&self, key: &K) {
        let mut entries = lock_recover(&self.entries);
        if let Some(entry) = entries.get_mut(key) {
            entry.refs -= 1;
            if entry.refs == 0 {
                entries.remove(key);
            }
        }
    }
}

/// Exclusive hold on one key; released on drop
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct KeyGuard<'a, K: LockKey = EntityKey> {
    table: &'a LockTable<K>,
    key: K,
    slot: Arc<Slot>,
}

impl<K: LockKey> KeyGuard<'_, K> {
    pub const fn key(&self) -> &K {
        &self.key
    }
}

impl<K: LockKey> fmt::Debug for KeyGuard<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard")
            .field("key", &self.key.to_string())
            .finish()
    }
}

impl<K: LockKey> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        *lock_recover(&self.slot.held) = false;
        self.slot.released.notify_one();
        self.table.checkin(&self.key);
        log::trace!("Unlocked {}", self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_same_key_is_exclusive() {
        let locks = LockTable::new();
        let counter = AtomicUsize::new(0);
        let inside = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..16 {
                s.spawn(|| {
                    for _ in 0..20 {
                        locks.with_lock(EntityKey::Id(7), || {
                            assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                            // Unsynchronized read-modify-write: only correct under the lock
                            let seen = counter.load(Ordering::SeqCst);
                            thread::yield_now();
                            counter.store(seen + 1, Ordering::SeqCst);
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                });
            }
        });

        assert_eq!(counter.load(Ordering::SeqCst), 16 * 20);
        assert_eq!(locks.tracked_keys(), 0);
    }

    #[test]
    fn test_distinct_keys_do_not_block() {
        let locks = LockTable::new();
        let _a = locks.lock(EntityKey::from("zone-a"));

        let (tx, rx) = mpsc::channel();
        thread::scope(|s| {
            s.spawn(|| {
                let _b = locks.lock(EntityKey::from("zone-b"));
                tx.send(()).unwrap();
            });
            rx.recv_timeout(Duration::from_secs(5))
                .expect("lock on a different key must not wait");
        });
    }

    #[test]
    fn test_entries_are_removed_after_release() {
        let locks = LockTable::new();
        {
            let _a = locks.lock(EntityKey::Id(1));
            let _b = locks.lock(EntityKey::Id(2));
            assert_eq!(locks.tracked_keys(), 2);
        }
        assert_eq!(locks.tracked_keys(), 0);

        thread::scope(|s| {
            for i in 0..8 {
                let locks = &locks;
                s.spawn(move || {
                    for j in 0..50 {
                        let _g = locks.lock(EntityKey::Id((i + j) % 3));
                    }
                });
            }
        });
        assert_eq!(locks.tracked_keys(), 0);
    }

    #[test]
    fn test_lock_timeout_gives_up() {
        let locks = LockTable::new();
        let held = locks.lock(EntityKey::from("pullzone/cdn"));

        thread::scope(|s| {
            s.spawn(|| {
                let err = locks
                    .lock_timeout(EntityKey::from("pullzone/cdn"), Duration::from_millis(30))
                    .unwrap_err();
                assert!(matches!(err, LockError::Timeout { .. }));
                assert!(err.to_string().contains("pullzone/cdn"));
            });
        });

        // The abandoned waiter must not keep the entry alive
        assert_eq!(locks.tracked_keys(), 1);
        drop(held);
        assert_eq!(locks.tracked_keys(), 0);

        let guard = locks
            .lock_timeout(EntityKey::from("pullzone/cdn"), Duration::from_millis(30))
            .unwrap();
        assert_eq!(guard.key(), &EntityKey::from("pullzone/cdn"));
    }

    #[test]
    fn test_try_lock() {
        let locks: LockTable<String> = LockTable::new();
        let guard = locks.try_lock("a".to_string()).unwrap();
        assert!(locks.try_lock("a".to_string()).is_none());
        assert!(locks.try_lock("b".to_string()).is_some());
        drop(guard);
        assert!(locks.try_lock("a".to_string()).is_some());
        assert_eq!(locks.tracked_keys(), 0);
    }

    #[test]
    fn test_released_when_critical_section_panics() {
        let locks = LockTable::new();
        let result = catch_unwind(AssertUnwindSafe(|| {
            locks.with_lock(EntityKey::Id(3), || panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(locks.tracked_keys(), 0);
        assert!(locks.try_lock(EntityKey::Id(3)).is_some());
    }

    #[test]
    fn test_waiter_acquires_after_release() {
        let locks = LockTable::new();
        let guard = locks.lock(EntityKey::Id(9));
        let order = Mutex::new(Vec::new());

        thread::scope(|s| {
            let waiter = s.spawn(|| {
                locks.with_lock(EntityKey::Id(9), || lock_recover(&order).push("waiter"));
            });
            thread::sleep(Duration::from_millis(20));
            lock_recover(&order).push("holder");
            drop(guard);
            waiter.join().unwrap();
        });

        assert_eq!(*lock_recover(&order), vec!["holder", "waiter"]);
    }

    #[test]
    fn test_entity_key_display_and_serde() {
        assert_eq!(EntityKey::Id(42).to_string(), "#42");
        assert_eq!(EntityKey::from("example.com").to_string(), "example.com");
        let keys: Vec<EntityKey> = serde_json::from_str(r#"[12, "cdn"]"#).unwrap();
        assert_eq!(keys, vec![EntityKey::Id(12), EntityKey::Name("cdn".into())]);
    }
}
