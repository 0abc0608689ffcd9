//! Storage key derivation.

use crate::fingerprint::Fingerprinter;
use crate::tts::SpeechRequest;
use serde::{Deserialize, Serialize};

pub const ANY_LANGUAGE: &str = "any-lang";
pub const ANY_VOICE: &str = "any-voice";

/// Hierarchical object key: `{language}/{voice}/{shard}/{fingerprint}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StorageKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StorageKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives storage keys from requests. Pure: no I/O, no failure modes.
#[derive(Debug, Clone, Default)]
pub struct KeyDeriver {
    fingerprinter: Fingerprinter,
}

impl KeyDeriver {
    pub fn new() -> Self {
        Self {
            fingerprinter: Fingerprinter::new(),
        }
    }

    pub fn with_fingerprinter(fingerprinter: Fingerprinter) -> Self {
        Self { fingerprinter }
    }

    /// The request's explicit `guid`, or the canonical hash of the whole request.
    pub fn fingerprint(&self, request: &SpeechRequest) -> String {
        if let Some(guid) = request.guid.as_deref().filter(|g| !g.is_empty()) {
            return guid.to_string();
        }
        self.fingerprinter.hash_value_untagged(&request.to_json())
    }

    pub fn derive(&self, request: &SpeechRequest) -> StorageKey {
        let guid = self.fingerprint(request);
        let shard: String = guid.chars().take(2).collect();
        let language = non_empty(request.language.as_deref()).unwrap_or(ANY_LANGUAGE);
        let voice = non_empty(request.voice.as_deref()).unwrap_or(ANY_VOICE);
        StorageKey(format!("{}/{}/{}/{}.json", language, voice, shard, guid))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
