//! Canonical request fingerprinting.
//!
//! Fingerprints are merkle hashes over the JSON form of a value: every node
//! hashes to the SHA-256 of its children's hashes, with object members visited
//! in sorted key order. Member order therefore never changes a fingerprint.
//!
//! An object carrying the hash tag (`guid` by default) as a string member
//! hashes to that member's value verbatim, which lets callers pin keys.

use crate::Result;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Default member name that pins an object's fingerprint.
pub const DEFAULT_HASH_TAG: &str = "guid";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprinter {
    hash_tag: Option<String>,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self {
            hash_tag: Some(DEFAULT_HASH_TAG.to_string()),
        }
    }

    pub fn with_hash_tag(mut self, tag: impl Into<String>) -> Self {
        self.hash_tag = Some(tag.into());
        self
    }

    /// Disable hash-tag pinning entirely.
    pub fn without_hash_tag(mut self) -> Self {
        self.hash_tag = None;
        self
    }

    pub fn hash_tag(&self) -> Option<&str> {
        self.hash_tag.as_deref()
    }

    /// Fingerprint any serializable value, honoring the hash tag.
    pub fn hash<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let value = serde_json::to_value(value)?;
        Ok(self.hash_value(&value))
    }

    pub fn hash_value(&self, value: &Value) -> String {
        self.node(value, true)
    }

    /// Fingerprint a value ignoring a hash tag on the top-level object.
    /// Nested objects still honor it.
    pub fn hash_value_untagged(&self, value: &Value) -> String {
        self.node(value, false)
    }

    fn node(&self, value: &Value, use_tag: bool) -> String {
        match value {
            Value::Object(map) => {
                if use_tag {
                    if let Some(Value::String(pinned)) =
                        self.hash_tag.as_deref().and_then(|tag| map.get(tag))
                    {
                        return pinned.clone();
                    }
                }
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut acc = String::from("{");
                for key in keys {
                    acc.push_str(&digest(key));
                    acc.push_str(&self.node(&map[key], true));
                }
                digest(&acc)
            }
            Value::Array(items) => {
                let mut acc = String::from("[");
                for item in items {
                    acc.push_str(&self.node(item, true));
                }
                digest(&acc)
            }
            scalar => digest(&scalar.to_string()),
        }
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

fn digest(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}
