//! Result cache: prior operation results keyed by (operation, node).
//!
//! The in-memory [`ResultCache`] never edits its map in place. Every
//! mutation reads the current snapshot, builds a new map, and swaps it in
//! only if no other writer got there first (otherwise it retries against the
//! newer snapshot). Readers clone an `Arc` and never wait on a writer that
//! is building a map.

use crate::error::StorageError;
use crate::graph::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

/// Unique cache key: two operations on the same node never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultKey {
    pub operation: String,
    pub node_id: NodeId,
}

impl ResultKey {
    pub fn new(operation: impl Into<String>, node_id: NodeId) -> Self {
        Self {
            operation: operation.into(),
            node_id,
        }
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.operation, self.node_id)
    }
}

/// A cached value plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult<V> {
    pub key: ResultKey,
    pub result: V,
    /// When the entry was stored. Eviction is based on this, not on access.
    pub timestamp: DateTime<Utc>,
    pub hits: u64,
}

/// Aggregate view of the cache contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub total_hits: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

/// Storage seam used by the executor.
///
/// Implementations must be safe to share between concurrently running node
/// applications.
pub trait ResultStore<V>: Send + Sync {
    /// Insert or overwrite the entry for `key`, resetting its hit count.
    fn store(&self, key: ResultKey, result: V) -> Result<(), StorageError>;

    /// Look up `key`, incrementing its hit count when present. The returned
    /// entry reflects the incremented count.
    fn get(&self, key: &ResultKey) -> Result<Option<StoredResult<V>>, StorageError>;

    fn has(&self, key: &ResultKey) -> Result<bool, StorageError>;

    /// Remove `key`. Returns whether an entry existed.
    fn delete(&self, key: &ResultKey) -> Result<bool, StorageError>;

    fn clear(&self) -> Result<(), StorageError>;

    fn stats(&self) -> Result<CacheStats, StorageError>;

    /// Remove entries stored more than `older_than` ago. Returns the number removed.
    fn gc(&self, older_than: Duration) -> Result<usize, StorageError>;
}

type Entries<V> = HashMap<ResultKey, StoredResult<V>>;

/// Process-lifetime, in-memory result cache.
pub struct ResultCache<V> {
    entries: RwLock<Arc<Entries<V>>>,
}

impl<V: Clone> ResultCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// The current immutable view of every entry.
    pub fn snapshot(&self) -> Result<Arc<Entries<V>>, StorageError> {
        self.read("snapshot")
    }

    /// Insert with an explicit storage timestamp (e.g. when restoring entries).
    pub fn store_at(&self, key: ResultKey, result: V, timestamp: DateTime<Utc>) -> Result<(), StorageError> {
        let entry = StoredResult {
            key: key.clone(),
            result,
            timestamp,
            hits: 0,
        };
        self.swap("store", |current| {
            let mut next = current.clone();
            next.insert(key.clone(), entry.clone());
            (Some(next), ())
        })
    }

    /// Remove every entry stored strictly before `cutoff`.
    pub fn gc_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        let removed = self.swap("gc", |current| {
            let next: Entries<V> = current
                .iter()
                .filter(|(_, entry)| entry.timestamp >= cutoff)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let removed = current.len() - next.len();
            if removed == 0 {
                (None, 0)
            } else {
                (Some(next), removed)
            }
        })?;
        debug!(removed, %cutoff, "Result cache gc");
        Ok(removed)
    }

    fn read(&self, operation: &str) -> Result<Arc<Entries<V>>, StorageError> {
        self.entries
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|e| StorageError::new(operation, e.to_string()))
    }

    /// Copy-on-write update with compare-and-swap retry.
    ///
    /// `mutate` sees the current snapshot and returns the replacement map
    /// (or `None` to leave the cache unchanged) plus a value to return. It
    /// may run more than once if another writer swaps first.
    fn swap<R>(
        &self,
        operation: &str,
        mut mutate: impl FnMut(&Entries<V>) -> (Option<Entries<V>>, R),
    ) -> Result<R, StorageError> {
        loop {
            let current = self.read(operation)?;
            let (next, out) = mutate(&current);
            let Some(next) = next else {
                return Ok(out);
            };

            let mut guard = self
                .entries
                .write()
                .map_err(|e| StorageError::new(operation, e.to_string()))?;
            if Arc::ptr_eq(&guard, &current) {
                *guard = Arc::new(next);
                return Ok(out);
            }
        }
    }
}

impl<V: Clone> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ResultStore<V> for ResultCache<V>
where
    V: Clone + Send + Sync,
{
    fn store(&self, key: ResultKey, result: V) -> Result<(), StorageError> {
        self.store_at(key, result, Utc::now())
    }

    fn get(&self, key: &ResultKey) -> Result<Option<StoredResult<V>>, StorageError> {
        self.swap("get", |current| match current.get(key) {
            Some(entry) => {
                let mut bumped = entry.clone();
                bumped.hits += 1;
                let mut next = current.clone();
                next.insert(key.clone(), bumped.clone());
                (Some(next), Some(bumped))
            }
            None => (None, None),
        })
    }

    fn has(&self, key: &ResultKey) -> Result<bool, StorageError> {
        Ok(self.read("has")?.contains_key(key))
    }

    fn delete(&self, key: &ResultKey) -> Result<bool, StorageError> {
        self.swap("delete", |current| {
            if current.contains_key(key) {
                let mut next = current.clone();
                next.remove(key);
                (Some(next), true)
            } else {
                (None, false)
            }
        })
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.swap("clear", |_| (Some(HashMap::new()), ()))
    }

    fn stats(&self) -> Result<CacheStats, StorageError> {
        let entries = self.read("stats")?;
        Ok(CacheStats {
            size: entries.len(),
            total_hits: entries.values().map(|e| e.hits).sum(),
            oldest_entry: entries.values().map(|e| e.timestamp).min(),
            newest_entry: entries.values().map(|e| e.timestamp).max(),
        })
    }

    fn gc(&self, older_than: Duration) -> Result<usize, StorageError> {
        let age = chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.gc_before(cutoff)
    }
}
