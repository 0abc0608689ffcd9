//! One-shot provisioning of the synthesizer and the cache container.
//!
//! The first caller of [`LazyInitializer::ensure_initialized`] starts the
//! provisioning sequence and every concurrent caller awaits that same
//! attempt. A successful attempt is kept for the initializer's lifetime; a
//! failed one is dropped so the next call starts over.

use crate::cache::{AtomicStats, ObjectCache};
use crate::config::SpeechCacheConfig;
use crate::store::{FsStore, ObjectStore};
use crate::tts::{HttpSynthesizer, Synthesizer};
use crate::utils::obfuscate;
use crate::{Error, ErrorContext, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard};

/// Ready handle produced by provisioning.
pub struct Provisioned {
    synthesizer: Arc<dyn Synthesizer>,
    cache: ObjectCache,
}

impl Provisioned {
    pub fn container(&self) -> &str {
        self.cache.container()
    }
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        self.cache.store()
    }
    pub fn synthesizer(&self) -> &Arc<dyn Synthesizer> {
        &self.synthesizer
    }
    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }
}

impl std::fmt::Debug for Provisioned {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioned")
            .field("container", &self.container())
            .field("store", &self.store().name())
            .field("synthesizer", &self.synthesizer.api())
            .finish()
    }
}

/// Observable initialization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initializing,
    Ready,
}

type InitOutcome = std::result::Result<Arc<Provisioned>, Arc<Error>>;
type PendingInit = Shared<BoxFuture<'static, InitOutcome>>;

enum Slot {
    Uninitialized,
    Initializing(PendingInit),
    Ready(Arc<Provisioned>),
}

pub struct LazyInitializer {
    instance: String,
    config: Arc<SpeechCacheConfig>,
    store: Option<Arc<dyn ObjectStore>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    stats: Arc<AtomicStats>,
    slot: Mutex<Slot>,
}

impl LazyInitializer {
    pub fn new(config: SpeechCacheConfig) -> Self {
        Self {
            instance: "LazyInitializer".to_string(),
            config: Arc::new(config),
            store: None,
            synthesizer: None,
            stats: Arc::new(AtomicStats::new()),
            slot: Mutex::new(Slot::Uninitialized),
        }
    }

    /// Use an existing store client instead of building one from config.
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use an existing synthesizer instead of building one from config.
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub(crate) fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    pub(crate) fn with_stats(mut self, stats: Arc<AtomicStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn config(&self) -> &SpeechCacheConfig {
        &self.config
    }

    pub fn state(&self) -> InitState {
        match self.lock_slot() {
            Ok(slot) => match &*slot {
                Slot::Uninitialized => InitState::Uninitialized,
                Slot::Initializing(_) => InitState::Initializing,
                Slot::Ready(_) => InitState::Ready,
            },
            Err(_) => InitState::Uninitialized,
        }
    }

    pub async fn ensure_initialized(&self) -> Result<Arc<Provisioned>> {
        let pending = {
            let mut slot = self.lock_slot()?;
            match &*slot {
                Slot::Ready(ready) => return Ok(ready.clone()),
                Slot::Initializing(pending) => pending.clone(),
                Slot::Uninitialized => {
                    let pending = self.start().shared();
                    *slot = Slot::Initializing(pending.clone());
                    pending
                }
            }
        };

        let outcome = pending.clone().await;

        let mut slot = self.lock_slot()?;
        let current = matches!(&*slot, Slot::Initializing(p) if p.ptr_eq(&pending));
        match outcome {
            Ok(ready) => {
                if current {
                    *slot = Slot::Ready(ready.clone());
                }
                Ok(ready)
            }
            Err(e) => {
                if current {
                    *slot = Slot::Uninitialized;
                }
                Err(Error::Initialization(e))
            }
        }
    }

    fn start(&self) -> BoxFuture<'static, InitOutcome> {
        let instance = self.instance.clone();
        let config = self.config.clone();
        let store = self.store.clone();
        let synthesizer = self.synthesizer.clone();
        let stats = self.stats.clone();
        async move {
            provision(&instance, &config, store, synthesizer, stats)
                .await
                .map(Arc::new)
                .map_err(|e| {
                    tracing::warn!(instance = %instance, error = %e, "initialize() failed");
                    Arc::new(e)
                })
        }
        .boxed()
    }

    fn lock_slot(&self) -> Result<MutexGuard<'_, Slot>> {
        self.slot.lock().map_err(|_| {
            Error::runtime_with_context(
                "LazyInitializer poisoned",
                ErrorContext::new().with_source("provision"),
            )
        })
    }
}

async fn provision(
    instance: &str,
    config: &SpeechCacheConfig,
    store: Option<Arc<dyn ObjectStore>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    stats: Arc<AtomicStats>,
) -> Result<Provisioned> {
    let synthesizer: Arc<dyn Synthesizer> = match synthesizer {
        Some(s) => s,
        None => {
            let synth = HttpSynthesizer::from_config(&config.synthesizer)?;
            tracing::debug!(
                instance = %instance,
                api = %config.synthesizer.api,
                api_version = %config.synthesizer.api_version,
                region = ?config.synthesizer.region,
                model = synth.model(),
                "initialize() built synthesizer"
            );
            Arc::new(synth)
        }
    };
    let store: Arc<dyn ObjectStore> = match store {
        Some(s) => s,
        None => {
            let mut fs = FsStore::new(&config.store.root);
            if let Some(region) = &config.store.region {
                fs = fs.with_region(region);
            }
            Arc::new(fs)
        }
    };

    let bucket = config.container.bucket.clone();
    let containers = store.list_containers().await?;
    match containers.iter().find(|c| c.name == bucket) {
        Some(existing) => {
            tracing::info!(
                instance = %instance,
                container = ?existing,
                synthesizer_access_key_id = %obfuscate(config.synthesizer.access_key_id.as_deref()),
                store_access_key_id = %obfuscate(config.store.access_key_id.as_deref()),
                "initialize() container exists"
            );
        }
        None => {
            let location = store.region().map(str::to_string);
            store.create_container(&bucket, location.as_deref()).await?;
            tracing::info!(
                instance = %instance,
                container = %bucket,
                location = ?location,
                store = store.name(),
                "initialize() created container"
            );
        }
    }

    Ok(Provisioned {
        synthesizer,
        cache: ObjectCache::with_stats(store, bucket, stats),
    })
}
