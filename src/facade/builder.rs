use super::SpeechCache;
use crate::cache::{AtomicStats, KeyDeriver};
use crate::config::{ConfigOptions, SpeechCacheConfig};
use crate::fingerprint::Fingerprinter;
use crate::provision::LazyInitializer;
use crate::store::ObjectStore;
use crate::tts::Synthesizer;
use crate::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

static INSTANCES: AtomicUsize = AtomicUsize::new(0);

/// Builder for [`SpeechCache`].
///
/// Without an explicit [`config`](Self::config), configuration is loaded from
/// the options, config file and environment at build time.
pub struct SpeechCacheBuilder {
    config: Option<SpeechCacheConfig>,
    config_path: Option<PathBuf>,
    options: ConfigOptions,
    store: Option<Arc<dyn ObjectStore>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    ignore_cache: bool,
    name: Option<String>,
}

impl SpeechCacheBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            config_path: None,
            options: ConfigOptions::default(),
            store: None,
            synthesizer: None,
            ignore_cache: false,
            name: None,
        }
    }

    /// Use a fully resolved configuration; skips file and environment loading.
    pub fn config(mut self, config: SpeechCacheConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Config file to layer under the explicit options.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Explicit options; highest precedence when loading.
    pub fn options(mut self, options: ConfigOptions) -> Self {
        self.options = options;
        self
    }

    /// Inject an object store client instead of building one from config.
    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Inject a synthesizer instead of building one from config.
    pub fn synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn ignore_cache(mut self, ignore: bool) -> Self {
        self.ignore_cache = ignore;
        self
    }

    /// Suffix appended to the generated instance name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<SpeechCache> {
        let config = match self.config {
            Some(config) => config,
            None => SpeechCacheConfig::load(self.config_path.as_deref(), self.options)?,
        };

        let n = INSTANCES.fetch_add(1, Ordering::Relaxed) + 1;
        let name = match self.name {
            Some(suffix) => format!("SpeechCache_{}.{}", n, suffix),
            None => format!("SpeechCache_{}", n),
        };

        let stats = Arc::new(AtomicStats::new());
        let mut init = LazyInitializer::new(config)
            .with_instance(name.clone())
            .with_stats(stats.clone());
        if let Some(store) = self.store {
            init = init.with_store(store);
        }
        if let Some(synthesizer) = self.synthesizer {
            init = init.with_synthesizer(synthesizer);
        }

        tracing::debug!(instance = %name, ignore_cache = self.ignore_cache, "created speech cache");
        Ok(SpeechCache {
            name,
            keys: KeyDeriver::new(),
            fingerprinter: Fingerprinter::new(),
            ignore_cache: AtomicBool::new(self.ignore_cache),
            stats,
            init,
        })
    }
}

impl Default for SpeechCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
