//! Layered configuration loading.
//!
//! Precedence, highest first: explicit options, config file, environment,
//! built-in defaults. Within the merged result a service section's own
//! region or credential wins over the top-level one.

use super::{
    ContainerConfig, SpeechCacheConfig, StoreConfig, SynthesizerConfig, DEFAULT_BUCKET,
    DEFAULT_STORE_ROOT, DEFAULT_SYNTH_API, DEFAULT_SYNTH_API_VERSION, DEFAULT_SYNTH_ENDPOINT,
    DEFAULT_SYNTH_MODEL, DEFAULT_SYNTH_TIMEOUT_SECS,
};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_REGION: &str = "SPEECH_CACHE_REGION";
pub const ENV_ACCESS_KEY_ID: &str = "SPEECH_CACHE_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "SPEECH_CACHE_SECRET_ACCESS_KEY";
pub const ENV_BUCKET: &str = "SPEECH_CACHE_BUCKET";
pub const ENV_CONFIG_PATH: &str = "SPEECH_CACHE_CONFIG";

/// One partial configuration layer. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub synthesizer: SynthesizerOptions,
    #[serde(default)]
    pub store: StoreOptions,
    #[serde(default)]
    pub container: ContainerOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthesizerOptions {
    pub api: Option<String>,
    pub api_version: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreOptions {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerOptions {
    pub bucket: Option<String>,
}

impl ConfigOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.container.bucket = Some(bucket.into());
        self
    }

    pub fn store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.store.root = Some(root.into());
        self
    }

    /// Layer read from process environment variables.
    pub fn from_env() -> Self {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        Self {
            region: get(ENV_REGION),
            access_key_id: get(ENV_ACCESS_KEY_ID),
            secret_access_key: get(ENV_SECRET_ACCESS_KEY),
            container: ContainerOptions { bucket: get(ENV_BUCKET) },
            ..Self::default()
        }
    }

    /// Layer read from a JSON or YAML file. A missing file yields `None`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let parsed = if ext == "yaml" || ext == "yml" {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map(Some).map_err(|reason| {
            Error::configuration_with_context(
                format!("Failed to parse config file: {}", reason),
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_source("config_loader"),
            )
        })
    }

    /// Fill every unset field of `self` from `lower`.
    pub fn merge(self, lower: ConfigOptions) -> ConfigOptions {
        let s = self.synthesizer;
        let ls = lower.synthesizer;
        ConfigOptions {
            region: self.region.or(lower.region),
            access_key_id: self.access_key_id.or(lower.access_key_id),
            secret_access_key: self.secret_access_key.or(lower.secret_access_key),
            synthesizer: SynthesizerOptions {
                api: s.api.or(ls.api),
                api_version: s.api_version.or(ls.api_version),
                endpoint: s.endpoint.or(ls.endpoint),
                model: s.model.or(ls.model),
                region: s.region.or(ls.region),
                access_key_id: s.access_key_id.or(ls.access_key_id),
                secret_access_key: s.secret_access_key.or(ls.secret_access_key),
                timeout_secs: s.timeout_secs.or(ls.timeout_secs),
            },
            store: StoreOptions {
                region: self.store.region.or(lower.store.region),
                access_key_id: self.store.access_key_id.or(lower.store.access_key_id),
                secret_access_key: self.store.secret_access_key.or(lower.store.secret_access_key),
                root: self.store.root.or(lower.store.root),
            },
            container: ContainerOptions {
                bucket: self.container.bucket.or(lower.container.bucket),
            },
        }
    }

    /// Apply built-in defaults and top-level inheritance.
    pub fn resolve(self) -> SpeechCacheConfig {
        let s = self.synthesizer;
        SpeechCacheConfig {
            synthesizer: SynthesizerConfig {
                api: s.api.unwrap_or_else(|| DEFAULT_SYNTH_API.to_string()),
                api_version: s.api_version.unwrap_or_else(|| DEFAULT_SYNTH_API_VERSION.to_string()),
                endpoint: s.endpoint.unwrap_or_else(|| DEFAULT_SYNTH_ENDPOINT.to_string()),
                model: s.model.unwrap_or_else(|| DEFAULT_SYNTH_MODEL.to_string()),
                region: s.region.or_else(|| self.region.clone()),
                access_key_id: s.access_key_id.or_else(|| self.access_key_id.clone()),
                secret_access_key: s.secret_access_key.or_else(|| self.secret_access_key.clone()),
                timeout_secs: s.timeout_secs.unwrap_or(DEFAULT_SYNTH_TIMEOUT_SECS),
            },
            store: StoreConfig {
                region: self.store.region.or_else(|| self.region.clone()),
                access_key_id: self.store.access_key_id.or_else(|| self.access_key_id.clone()),
                secret_access_key: self
                    .store
                    .secret_access_key
                    .or_else(|| self.secret_access_key.clone()),
                root: self.store.root.unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_ROOT)),
            },
            container: ContainerConfig {
                bucket: self.container.bucket.unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            },
            region: self.region,
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
        }
    }
}

impl SpeechCacheConfig {
    /// Merge `explicit` over the config file (`path`, else `$SPEECH_CACHE_CONFIG`)
    /// over the environment over defaults.
    pub fn load(path: Option<&Path>, explicit: ConfigOptions) -> Result<Self> {
        Self::load_with(path, explicit, ConfigOptions::from_env())
    }

    pub fn load_with(
        path: Option<&Path>,
        explicit: ConfigOptions,
        env: ConfigOptions,
    ) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from));
        let file = match path {
            Some(p) => {
                let layer = ConfigOptions::from_file(&p)?;
                if layer.is_none() {
                    tracing::debug!(path = %p.display(), "config file not found; skipping");
                }
                layer.unwrap_or_default()
            }
            None => ConfigOptions::default(),
        };
        Ok(explicit.merge(file).merge(env).resolve())
    }
}
