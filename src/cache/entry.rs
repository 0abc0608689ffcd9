//! Persisted cache entries.

use super::key::StorageKey;
use crate::tts::{AudioArtifact, SpeechRequest};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};

/// The stored triple: original request, its storage key and the synthesized audio.
///
/// Serialized as `{"request": .., "storageKey": .., "response": ..}` on every
/// read and write path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub request: SpeechRequest,
    pub storage_key: StorageKey,
    pub response: AudioArtifact,
}

impl CacheEntry {
    pub fn new(request: SpeechRequest, storage_key: StorageKey, response: AudioArtifact) -> Self {
        Self { request, storage_key, response }
    }

    /// Fail unless this entry is addressed by `key`.
    pub fn ensure_key(&self, key: &StorageKey) -> Result<()> {
        if &self.storage_key != key {
            return Err(Error::validation_with_context(
                format!("storageKey expected {} actual:{}", key, self.storage_key),
                ErrorContext::new()
                    .with_field_path("entry.storageKey")
                    .with_source("object_cache"),
            ));
        }
        Ok(())
    }
}

/// Result of a change-detecting write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutOutcome {
    pub storage_key: StorageKey,
    /// False when the stored entry already had identical content.
    pub updated: bool,
}
