//! Object cache: key-addressed entries over an [`ObjectStore`] container.

use super::entry::{CacheEntry, PutOutcome};
use super::key::StorageKey;
use crate::fingerprint::Fingerprinter;
use crate::store::ObjectStore;
use crate::{ErrorKind, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of a cache instance's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub reads: u64,
    pub writes: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Per-instance counters. Monotonic; shared between the facade and its cache.
#[derive(Debug, Default)]
pub(crate) struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl AtomicStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) -> u64 {
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_miss(&self) -> u64 {
        self.misses.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_error(&self) -> u64 {
        self.errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}

/// Reads, writes and deletes [`CacheEntry`] documents in one container.
///
/// `put` compares content hashes with the stored document and skips identical
/// writes. The read-compare-write sequence is not atomic: concurrent writers
/// to the same key race and the last write wins.
#[derive(Clone)]
pub struct ObjectCache {
    store: Arc<dyn ObjectStore>,
    container: String,
    fingerprinter: Fingerprinter,
    stats: Arc<AtomicStats>,
}

impl ObjectCache {
    pub fn new(store: Arc<dyn ObjectStore>, container: impl Into<String>) -> Self {
        Self::with_stats(store, container, Arc::new(AtomicStats::new()))
    }

    pub(crate) fn with_stats(
        store: Arc<dyn ObjectStore>,
        container: impl Into<String>,
        stats: Arc<AtomicStats>,
    ) -> Self {
        Self {
            store,
            container: container.into(),
            fingerprinter: Fingerprinter::new(),
            stats,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    /// Fetch and parse the entry at `key`; `None` when nothing is stored there.
    pub async fn get(&self, key: &StorageKey) -> Result<Option<CacheEntry>> {
        match self.fetch(key).await? {
            Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
            None => Ok(None),
        }
    }

    /// Delete the entry at `key`, returning what was stored there.
    ///
    /// The delete is issued even when the preceding read fails. An
    /// unparseable stored body yields `None`; any other read failure is
    /// returned once the delete has been attempted.
    pub async fn delete(&self, key: &StorageKey) -> Result<Option<CacheEntry>> {
        let previous = self.get(key).await;
        self.stats.record_write();
        self.store.delete_object(&self.container, key.as_str()).await?;
        match previous {
            Ok(previous) => {
                tracing::debug!(
                    container = %self.container,
                    key = %key,
                    existed = previous.is_some(),
                    "deleted cache entry"
                );
                Ok(previous)
            }
            Err(e) if e.kind() == ErrorKind::Serialization => {
                tracing::warn!(
                    container = %self.container,
                    key = %key,
                    error = %e,
                    "deleted unreadable cache entry"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Change-detecting write.
    pub async fn put(&self, key: &StorageKey, entry: &CacheEntry) -> Result<PutOutcome> {
        entry.ensure_key(key)?;
        entry.request.validate()?;
        let candidate = self.fingerprinter.hash(entry)?;
        let unchanged = match self.fetch(key).await? {
            Some(body) => {
                let existing: serde_json::Value = serde_json::from_slice(&body)?;
                let same = self.fingerprinter.hash_value(&existing) == candidate;
                if !same {
                    tracing::debug!(key = %key, "cache entry has changed");
                }
                same
            }
            None => false,
        };
        if !unchanged {
            self.write(key, entry).await?;
        }
        Ok(PutOutcome {
            storage_key: key.clone(),
            updated: !unchanged,
        })
    }

    /// Unconditional write.
    pub async fn write(&self, key: &StorageKey, entry: &CacheEntry) -> Result<()> {
        entry.request.validate()?;
        let body = serde_json::to_vec(entry)?;
        self.stats.record_write();
        self.store.put_object(&self.container, key.as_str(), body).await
    }

    async fn fetch(&self, key: &StorageKey) -> Result<Option<Vec<u8>>> {
        self.stats.record_read();
        match self.store.get_object(&self.container, key.as_str()).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
