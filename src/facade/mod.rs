//! Speech cache facade: the public `speak` / `preload` surface.
//!
//! A [`SpeechCache`] derives a storage key for every request, serves cached
//! audio when present and otherwise calls the synthesizer and persists the
//! result. Provisioning runs lazily on first use.

mod builder;

pub use builder::SpeechCacheBuilder;

use crate::cache::{AtomicStats, CacheEntry, CacheStats, KeyDeriver, PutOutcome, StorageKey};
use crate::fingerprint::Fingerprinter;
use crate::provision::{InitState, LazyInitializer, Provisioned};
use crate::tts::{AudioArtifact, SpeechRequest};
use crate::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct SpeechCache {
    name: String,
    keys: KeyDeriver,
    fingerprinter: Fingerprinter,
    ignore_cache: AtomicBool,
    stats: Arc<AtomicStats>,
    init: LazyInitializer,
}

impl SpeechCache {
    pub fn builder() -> SpeechCacheBuilder {
        SpeechCacheBuilder::new()
    }

    /// Instance name used in log events, e.g. `SpeechCache_3.narrator`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn ignore_cache(&self) -> bool {
        self.ignore_cache.load(Ordering::Relaxed)
    }

    /// When set, `speak` always synthesizes and overwrites the stored entry.
    pub fn set_ignore_cache(&self, ignore: bool) {
        self.ignore_cache.store(ignore, Ordering::Relaxed);
    }

    pub fn init_state(&self) -> InitState {
        self.init.state()
    }

    /// Provision the synthesizer and container. Idempotent; concurrent
    /// callers share one attempt.
    pub async fn initialize(&self) -> Result<Arc<Provisioned>> {
        self.init.ensure_initialized().await
    }

    pub fn storage_key(&self, request: &SpeechRequest) -> StorageKey {
        self.keys.derive(request)
    }

    /// Canonical hash of any value, ignoring a top-level `guid`.
    pub fn hash<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let value = serde_json::to_value(value)?;
        Ok(self.fingerprinter.hash_value_untagged(&value))
    }

    pub async fn get_entry(&self, key: &StorageKey) -> Result<Option<CacheEntry>> {
        let ready = self.initialize().await?;
        ready.cache().get(key).await
    }

    /// Remove the entry at `key`, returning what was stored there.
    pub async fn delete_entry(&self, key: &StorageKey) -> Result<Option<CacheEntry>> {
        let ready = self.initialize().await?;
        ready.cache().delete(key).await
    }

    /// Change-detecting write of `entry` at `key`.
    pub async fn put_entry(&self, key: &StorageKey, entry: &CacheEntry) -> Result<PutOutcome> {
        entry.ensure_key(key)?;
        let ready = self.initialize().await?;
        ready.cache().put(key, entry).await
    }

    /// Store `response` for `request` without calling the synthesizer.
    /// Repeating a preload with identical content performs no write.
    pub async fn preload(
        &self,
        request: &SpeechRequest,
        response: AudioArtifact,
    ) -> Result<PutOutcome> {
        request.validate()?;
        let key = self.storage_key(request);
        let entry = CacheEntry::new(request.clone(), key.clone(), response);
        self.put_entry(&key, &entry).await
    }

    /// Like [`speak`](Self::speak) for loosely typed input; `null` and
    /// malformed requests are rejected before any I/O.
    pub async fn speak_value(&self, request: serde_json::Value) -> Result<CacheEntry> {
        let request = SpeechRequest::from_value(request)?;
        self.speak(&request).await
    }

    pub async fn speak(&self, request: &SpeechRequest) -> Result<CacheEntry> {
        request.validate()?;
        let ready = self.initialize().await?;
        let key = self.storage_key(request);
        let cache = ready.cache();
        let synthesizer = ready.synthesizer();

        if !self.ignore_cache() {
            match cache.get(&key).await {
                Ok(Some(entry)) => {
                    let hits = self.stats.record_hit();
                    tracing::debug!(
                        instance = %self.name,
                        hits,
                        misses = self.stats.to_stats().misses,
                        usage = synthesizer.usage(),
                        key = %key,
                        text = %request.text,
                        "speak() cache hit"
                    );
                    return Ok(entry);
                }
                Ok(None) => {}
                Err(e) => {
                    let errors = self.stats.record_error();
                    tracing::error!(
                        instance = %self.name,
                        errors,
                        key = %key,
                        error = %e,
                        "speak() cache read failed"
                    );
                    return Err(e);
                }
            }
        }

        let response = match synthesizer.speak(request).await {
            Ok(response) => response,
            Err(e) => {
                let errors = self.stats.record_error();
                tracing::error!(
                    instance = %self.name,
                    errors,
                    key = %key,
                    error = %e,
                    "speak() synthesis failed"
                );
                return Err(e);
            }
        };
        let misses = self.stats.record_miss();
        tracing::info!(
            instance = %self.name,
            misses,
            hits = self.stats.to_stats().hits,
            usage = synthesizer.usage(),
            key = %key,
            text = %request.text,
            "speak() cache miss"
        );

        let entry = CacheEntry::new(request.clone(), key.clone(), response);
        if let Err(e) = cache.write(&key, &entry).await {
            let errors = self.stats.record_error();
            tracing::error!(
                instance = %self.name,
                errors,
                key = %key,
                error = %e,
                "speak() cache write failed"
            );
            return Err(e);
        }
        Ok(entry)
    }
}

impl std::fmt::Debug for SpeechCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechCache")
            .field("name", &self.name)
            .field("ignore_cache", &self.ignore_cache())
            .field("state", &self.init_state())
            .field("stats", &self.stats())
            .finish()
    }
}
