//! # speech-cache
//!
//! 面向确定性语音合成调用的内容寻址缓存，以对象存储为后端。
//!
//! Content-addressable cache for expensive, deterministic text-to-speech
//! synthesis, backed by an object store.
//!
//! ## Overview
//!
//! Given a speech request (text, voice, language, audio format), the cache
//! returns previously synthesized audio when available; otherwise it calls the
//! synthesis provider, persists the result and returns it.
//!
//! - **Deterministic keys**: requests hash to a canonical fingerprint, so
//!   member order never matters and an explicit `guid` pins the key
//! - **Lazy provisioning**: the synthesizer and backing container are set up
//!   once, on first use, shared by concurrent callers and retried after failure
//! - **Change detection**: `preload` skips writes whose content is already stored
//! - **Statistics**: per-instance hit/miss/error/read/write counters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use speech_cache::{SpeechCache, SpeechRequest};
//!
//! #[tokio::main]
//! async fn main() -> speech_cache::Result<()> {
//!     let cache = SpeechCache::builder().build()?;
//!     let request = SpeechRequest::new("openai-tts", "hello", "mp3")
//!         .with_voice("alloy")
//!         .with_language("en-US");
//!     let entry = cache.speak(&request).await?;
//!     println!("{} -> {}", entry.storage_key, entry.response.mime);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`facade`] | [`SpeechCache`]: `speak`, `preload`, entry access |
//! | [`cache`] | Key derivation and the object cache |
//! | [`provision`] | One-shot lazy initialization |
//! | [`store`] | Object store capability and implementations |
//! | [`tts`] | Synthesizer capability and HTTP implementation |
//! | [`fingerprint`] | Canonical request hashing |
//! | [`config`] | Layered configuration |

pub mod cache;
pub mod config;
pub mod facade;
pub mod fingerprint;
pub mod provision;
pub mod store;
pub mod tts;
pub mod utils;

// Re-export main types for convenience
pub use cache::{CacheEntry, CacheStats, KeyDeriver, ObjectCache, PutOutcome, StorageKey};
pub use config::{ConfigOptions, SpeechCacheConfig};
pub use facade::{SpeechCache, SpeechCacheBuilder};
pub use fingerprint::Fingerprinter;
pub use provision::{InitState, LazyInitializer, Provisioned};
pub use store::{ContainerDescriptor, FsStore, MemoryStore, ObjectStore};
pub use tts::{AudioArtifact, AudioFormat, HttpSynthesizer, SpeechRequest, Synthesizer};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};
