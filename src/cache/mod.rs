//! 请求指纹缓存模块：以确定性存储键在对象存储中保存语音合成结果。
//!
//! # Request-Fingerprint Cache
//!
//! Synthesized audio is stored as JSON documents addressed by a key derived
//! from the request's canonical fingerprint, so identical requests always map
//! to the same object.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`KeyDeriver`] | Pure request → [`StorageKey`] derivation |
//! | [`ObjectCache`] | get/put/delete with statistics and change detection |
//! | [`CacheEntry`] | Stored `{request, storageKey, response}` document |
//! | [`CacheStats`] | Hit/miss/error/read/write counters |
//!
//! ## Key Layout
//!
//! ```text
//! {language|any-lang}/{voice|any-voice}/{first 2 chars of guid}/{guid}.json
//! ```
//!
//! The two-character shard bounds the number of objects under any one prefix.
//! Entries never expire and are never evicted.

mod entry;
mod key;
mod manager;

pub use entry::{CacheEntry, PutOutcome};
pub use key::{KeyDeriver, StorageKey, ANY_LANGUAGE, ANY_VOICE};
pub use manager::{CacheStats, ObjectCache};
pub(crate) use manager::AtomicStats;
