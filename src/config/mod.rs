//! Configuration structures
//!
//! Resolved configuration for the synthesizer, the object store and the
//! cache container. Layers are described by [`ConfigOptions`] and merged by
//! the [`loader`].

pub mod loader;

pub use loader::{ConfigOptions, ContainerOptions, StoreOptions, SynthesizerOptions};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BUCKET: &str = "say-again.say-again";
pub const DEFAULT_SYNTH_API: &str = crate::tts::DEFAULT_API;
pub const DEFAULT_SYNTH_API_VERSION: &str = "v1";
pub const DEFAULT_SYNTH_ENDPOINT: &str = "https://api.openai.com/v1/audio/speech";
pub const DEFAULT_SYNTH_MODEL: &str = "tts-1";
pub const DEFAULT_SYNTH_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_STORE_ROOT: &str = "local/object-store";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechCacheConfig {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub synthesizer: SynthesizerConfig,
    pub store: StoreConfig,
    pub container: ContainerConfig,
}

/// Synthesis provider settings. Region and credentials fall back to the
/// top-level values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    pub api: String,
    pub api_version: String,
    pub endpoint: String,
    pub model: String,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub timeout_secs: u64,
}

/// Object store settings. Region and credentials fall back to the top-level
/// values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub bucket: String,
}

impl SpeechCacheConfig {
    /// Built-in defaults only.
    pub fn defaults() -> Self {
        ConfigOptions::default().resolve()
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.container.bucket = bucket.into();
        self
    }

    pub fn with_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.store.root = root.into();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.container.bucket
    }
}

impl Default for SpeechCacheConfig {
    fn default() -> Self {
        Self::defaults()
    }
}
